//! JobStore — the single snapshot file of the active job.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::JobState;

/// File name of the snapshot inside the store directory.
pub const SNAPSHOT_FILE: &str = "pregen-job.json";

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Directory-backed store holding at most one job snapshot.
#[derive(Debug, Clone)]
pub struct JobStore {
    path: PathBuf,
    tmp: PathBuf,
}

impl JobStore {
    /// Open (or create) the store directory.
    pub fn open(dir: &Path) -> StateResult<Self> {
        fs::create_dir_all(dir).map_err(map_err!(Io))?;
        let path = dir.join(SNAPSHOT_FILE);
        let tmp = dir.join(format!("{SNAPSHOT_FILE}.tmp"));
        debug!(?path, "job store opened");
        Ok(Self { path, tmp })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a snapshot file exists, valid or not.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Atomically replace the snapshot.
    pub fn save(&self, state: &JobState) -> StateResult<()> {
        let bytes = state.to_json()?;
        {
            let mut file = fs::File::create(&self.tmp).map_err(map_err!(Io))?;
            file.write_all(&bytes).map_err(map_err!(Io))?;
            file.sync_all().map_err(map_err!(Io))?;
        }
        fs::rename(&self.tmp, &self.path).map_err(map_err!(Io))?;
        debug!(world = %state.world_id, done = state.done, "job snapshot saved");
        Ok(())
    }

    /// Load the snapshot. `Ok(None)` when there is none.
    pub fn load(&self) -> StateResult<Option<JobState>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::Io(e.to_string())),
        };
        JobState::from_json(&bytes).map(Some)
    }

    /// Delete the snapshot. Returns true if one existed.
    pub fn clear(&self) -> StateResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = ?self.path, "job snapshot cleared");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StateError::Io(e.to_string())),
        }
    }
}
