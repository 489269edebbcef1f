//! Persisted job snapshot.

use std::time::{SystemTime, UNIX_EPOCH};

use pregen_core::{Area, CursorState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StateError, StateResult};

/// Identifier of a host world.
pub type WorldId = Uuid;

/// Everything needed to resume a job after a restart.
///
/// Serialized as a camelCase JSON object:
///
/// ```text
/// { "worldId": "…", "starterId": null, "startedAtMs": 0,
///   "done": 0, "skipped": 0, "errors": 0,
///   "area":   { "type": "circle", "centerX": 0, "centerZ": 0, "radius": 10 },
///   "cursor": { "regionX": 0, "regionZ": 0, "localX": 0, "localZ": 0, "finished": false } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobState {
    pub world_id: WorldId,
    pub starter_id: Option<String>,
    pub started_at_ms: u64,
    pub done: u64,
    pub skipped: u64,
    pub errors: u64,
    pub area: Area,
    pub cursor: CursorState,
}

/// Loose on-disk form, validated into a [`JobState`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStateRecord {
    #[serde(default)]
    world_id: Option<String>,
    #[serde(default)]
    starter_id: Option<String>,
    #[serde(default)]
    started_at_ms: i64,
    #[serde(default)]
    done: i64,
    #[serde(default)]
    skipped: i64,
    #[serde(default)]
    errors: i64,
    area: Area,
    cursor: CursorState,
}

impl JobState {
    /// Decode a snapshot. Counters below zero read as zero.
    pub fn from_json(bytes: &[u8]) -> StateResult<Self> {
        let record: JobStateRecord =
            serde_json::from_slice(bytes).map_err(|e| StateError::Deserialize(e.to_string()))?;

        let raw_id = record.world_id.unwrap_or_default();
        let world_id =
            Uuid::parse_str(raw_id.trim()).map_err(|_| StateError::InvalidWorldId(raw_id.clone()))?;

        let clamp = |v: i64| v.max(0) as u64;
        Ok(Self {
            world_id,
            starter_id: record.starter_id,
            started_at_ms: clamp(record.started_at_ms),
            done: clamp(record.done),
            skipped: clamp(record.skipped),
            errors: clamp(record.errors),
            area: record.area,
            cursor: record.cursor,
        })
    }

    pub fn to_json(&self) -> StateResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| StateError::Serialize(e.to_string()))
    }
}

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
