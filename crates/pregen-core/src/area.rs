//! Areas to pre-generate, in chunk coordinates.
//!
//! An [`Area`] is one of a fixed set of shapes plus the inclusive bounding
//! box the shape's cursor rasterizes. The bounding box is derived once at
//! construction and is the smallest box holding every chunk the shape
//! yields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cursor::{circle_half_width, Cursor, CursorState};

/// Block width of a chunk.
const CHUNK_BLOCKS: i32 = 16;

/// Errors decoding a persisted area.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AreaError {
    #[error("unknown area type: {0}")]
    UnknownType(String),
}

/// The shape variants an area can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Circle { center_x: i32, center_z: i32, radius: i32 },
    Square { center_x: i32, center_z: i32, radius: i32 },
    Rect { min_x: i32, min_z: i32, max_x: i32, max_z: i32 },
    /// Rectangle derived from the host's world border.
    WorldBorder { min_x: i32, min_z: i32, max_x: i32, max_z: i32 },
}

impl Shape {
    /// Name used in snapshots and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Circle { .. } => "circle",
            Shape::Square { .. } => "square",
            Shape::Rect { .. } => "rect",
            Shape::WorldBorder { .. } => "worldborder",
        }
    }
}

/// Inclusive chunk bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl Bounds {
    fn normalized(x0: i32, z0: i32, x1: i32, z1: i32) -> Self {
        Self {
            min_x: x0.min(x1),
            min_z: z0.min(z1),
            max_x: x0.max(x1),
            max_z: z0.max(z1),
        }
    }

    /// Box of `center ± radius`; `radius` must already fit (see [`fit_radius`]).
    fn around(center_x: i32, center_z: i32, radius: i32) -> Self {
        Self {
            min_x: center_x - radius,
            min_z: center_z - radius,
            max_x: center_x + radius,
            max_z: center_z + radius,
        }
    }

    pub fn width(&self) -> u64 {
        (i64::from(self.max_x) - i64::from(self.min_x) + 1) as u64
    }

    pub fn height(&self) -> u64 {
        (i64::from(self.max_z) - i64::from(self.min_z) + 1) as u64
    }
}

/// Largest radius `<= radius` whose box around the center stays in `i32`.
///
/// Negative radii clamp to 0.
fn fit_radius(center_x: i32, center_z: i32, radius: i32) -> i32 {
    let room = |c: i32| {
        let c = i64::from(c);
        (i64::from(i32::MAX) - c).min(c - i64::from(i32::MIN))
    };
    // The nearer edge is at most i32::MAX away.
    i64::from(radius.max(0)).min(room(center_x)).min(room(center_z)) as i32
}

/// A host world border, in block coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBorder {
    pub center_x: f64,
    pub center_z: f64,
    /// Full side length in blocks.
    pub size: f64,
}

/// A region of chunks to pre-generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AreaRecord", into = "AreaRecord")]
pub struct Area {
    shape: Shape,
    bounds: Bounds,
}

impl Area {
    /// Circle of `radius` chunks around a center chunk.
    ///
    /// Negative radii clamp to 0, and radii reaching past the `i32` range
    /// shrink until the circle fits.
    pub fn circle(center_x: i32, center_z: i32, radius: i32) -> Self {
        let radius = fit_radius(center_x, center_z, radius);
        Self {
            shape: Shape::Circle { center_x, center_z, radius },
            bounds: Bounds::around(center_x, center_z, radius),
        }
    }

    /// Square of side `2 * radius + 1` around a center chunk.
    pub fn square(center_x: i32, center_z: i32, radius: i32) -> Self {
        let radius = fit_radius(center_x, center_z, radius);
        Self {
            shape: Shape::Square { center_x, center_z, radius },
            bounds: Bounds::around(center_x, center_z, radius),
        }
    }

    /// Rectangle between two corners, inclusive, in any order.
    pub fn rect(x0: i32, z0: i32, x1: i32, z1: i32) -> Self {
        let bounds = Bounds::normalized(x0, z0, x1, z1);
        Self {
            shape: Shape::Rect {
                min_x: bounds.min_x,
                min_z: bounds.min_z,
                max_x: bounds.max_x,
                max_z: bounds.max_z,
            },
            bounds,
        }
    }

    /// World-border rectangle from precomputed chunk bounds.
    pub fn from_bounds(x0: i32, z0: i32, x1: i32, z1: i32) -> Self {
        let bounds = Bounds::normalized(x0, z0, x1, z1);
        Self {
            shape: Shape::WorldBorder {
                min_x: bounds.min_x,
                min_z: bounds.min_z,
                max_x: bounds.max_x,
                max_z: bounds.max_z,
            },
            bounds,
        }
    }

    /// Every chunk touched by the block-space square of a world border.
    pub fn world_border(border: &WorldBorder) -> Self {
        let half = border.size / 2.0;
        let min_block_x = (border.center_x - half).floor() as i32;
        let max_block_x = (border.center_x + half).floor() as i32;
        let min_block_z = (border.center_z - half).floor() as i32;
        let max_block_z = (border.center_z + half).floor() as i32;

        Self::from_bounds(
            min_block_x.div_euclid(CHUNK_BLOCKS),
            min_block_z.div_euclid(CHUNK_BLOCKS),
            max_block_x.div_euclid(CHUNK_BLOCKS),
            max_block_z.div_euclid(CHUNK_BLOCKS),
        )
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn name(&self) -> &'static str {
        self.shape.name()
    }

    /// Exact number of chunks a cursor over this area yields.
    ///
    /// The full `i32` plane holds 2^64 chunks and saturates at `u64::MAX`;
    /// every smaller area is exact.
    pub fn total_chunks(&self) -> u64 {
        match self.shape {
            Shape::Circle { radius, .. } => {
                let r = i64::from(radius);
                (-r..=r)
                    .filter_map(|dz| circle_half_width(radius, dz))
                    .map(|dx| 2 * dx as u64 + 1)
                    .sum()
            }
            Shape::Square { .. } | Shape::Rect { .. } | Shape::WorldBorder { .. } => {
                self.bounds.width().saturating_mul(self.bounds.height())
            }
        }
    }

    /// Whether `(x, z)` belongs to the area.
    pub fn contains(&self, x: i32, z: i32) -> bool {
        let b = &self.bounds;
        if x < b.min_x || x > b.max_x || z < b.min_z || z > b.max_z {
            return false;
        }
        match self.shape {
            Shape::Circle { center_x, center_z, radius } => {
                match circle_half_width(radius, i64::from(z) - i64::from(center_z)) {
                    Some(dx) => (i64::from(x) - i64::from(center_x)).abs() <= i64::from(dx),
                    None => false,
                }
            }
            _ => true,
        }
    }

    /// Cursor over the area, starting fresh or from a saved position.
    pub fn cursor(&self, resume: Option<CursorState>) -> Cursor {
        Cursor::new(self, resume)
    }
}

/// Flat on-disk form of an [`Area`]: a `type` tag plus shape fields.
///
/// Missing integer fields read as 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AreaRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    center_x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    center_z: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    radius: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_z: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_z: Option<i32>,
}

impl TryFrom<AreaRecord> for Area {
    type Error = AreaError;

    fn try_from(r: AreaRecord) -> Result<Self, AreaError> {
        let get = |v: Option<i32>| v.unwrap_or(0);
        match r.kind.to_ascii_lowercase().as_str() {
            "circle" => Ok(Area::circle(get(r.center_x), get(r.center_z), get(r.radius))),
            "square" => Ok(Area::square(get(r.center_x), get(r.center_z), get(r.radius))),
            "rect" => Ok(Area::rect(get(r.min_x), get(r.min_z), get(r.max_x), get(r.max_z))),
            "worldborder" => Ok(Area::from_bounds(
                get(r.min_x),
                get(r.min_z),
                get(r.max_x),
                get(r.max_z),
            )),
            _ => Err(AreaError::UnknownType(r.kind)),
        }
    }
}

impl From<Area> for AreaRecord {
    fn from(area: Area) -> Self {
        let kind = area.name().to_string();
        match area.shape {
            Shape::Circle { center_x, center_z, radius }
            | Shape::Square { center_x, center_z, radius } => AreaRecord {
                kind,
                center_x: Some(center_x),
                center_z: Some(center_z),
                radius: Some(radius),
                ..AreaRecord::default()
            },
            Shape::Rect { min_x, min_z, max_x, max_z }
            | Shape::WorldBorder { min_x, min_z, max_x, max_z } => AreaRecord {
                kind,
                min_x: Some(min_x),
                min_z: Some(min_z),
                max_x: Some(max_x),
                max_z: Some(max_z),
                ..AreaRecord::default()
            },
        }
    }
}
