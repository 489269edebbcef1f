//! Region-major, resumable traversal over an [`Area`](crate::area::Area).
//!
//! Whole 32×32 regions are visited row-major (region z outer, region x
//! inner) and, inside each region, chunks are visited row-major (local z
//! outer, local x inner). This matches the on-disk region layout, so a
//! host that stores chunks in region files touches each file in one burst.
//!
//! Shapes narrower than their bounding box are post-filters over the
//! rectangular raster: skipped coordinates still advance the scan, so a
//! [`CursorState`] taken at any point resumes the exact same suffix.

use serde::{Deserialize, Serialize};

use crate::area::{Area, Shape};
use crate::key::{ChunkKey, REGION_SHIFT, REGION_SIZE};

/// Exact resumption point of a cursor.
///
/// Always describes the position *after* the last key handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorState {
    pub region_x: i32,
    pub region_z: i32,
    pub local_x: i32,
    pub local_z: i32,
    #[serde(default)]
    pub finished: bool,
}

/// Raster over a rectangle of chunks in region-major order.
#[derive(Debug, Clone)]
struct RegionRaster {
    min_x: i32,
    min_z: i32,
    max_x: i32,
    max_z: i32,
    min_region_x: i32,
    max_region_x: i32,
    max_region_z: i32,
    region_x: i32,
    region_z: i32,
    local_x: i32,
    local_z: i32,
    finished: bool,
}

impl RegionRaster {
    fn new(min_x: i32, min_z: i32, max_x: i32, max_z: i32, resume: Option<CursorState>) -> Self {
        let min_region_x = min_x >> REGION_SHIFT;
        let min_region_z = min_z >> REGION_SHIFT;
        let (region_x, region_z, local_x, local_z, finished) = match resume {
            Some(s) => (
                s.region_x,
                s.region_z,
                s.local_x.clamp(0, REGION_SIZE - 1),
                s.local_z.clamp(0, REGION_SIZE - 1),
                s.finished,
            ),
            None => (min_region_x, min_region_z, 0, 0, false),
        };

        Self {
            min_x,
            min_z,
            max_x,
            max_z,
            min_region_x,
            max_region_x: max_x >> REGION_SHIFT,
            max_region_z: max_z >> REGION_SHIFT,
            region_x,
            region_z,
            local_x,
            local_z,
            finished,
        }
    }

    fn next_key(&mut self) -> Option<ChunkKey> {
        if self.finished {
            return None;
        }
        loop {
            if self.region_z > self.max_region_z {
                self.finished = true;
                return None;
            }
            if self.region_x > self.max_region_x {
                self.region_x = self.min_region_x;
                self.region_z += 1;
                self.local_x = 0;
                self.local_z = 0;
                continue;
            }

            let x = (self.region_x << REGION_SHIFT) + self.local_x;
            let z = (self.region_z << REGION_SHIFT) + self.local_z;
            self.advance();

            if x < self.min_x || x > self.max_x || z < self.min_z || z > self.max_z {
                continue;
            }
            return Some(ChunkKey::pack(x, z));
        }
    }

    fn advance(&mut self) {
        self.local_x += 1;
        if self.local_x >= REGION_SIZE {
            self.local_x = 0;
            self.local_z += 1;
            if self.local_z >= REGION_SIZE {
                self.local_z = 0;
                self.region_x += 1;
            }
        }
    }

    fn state(&self) -> CursorState {
        CursorState {
            region_x: self.region_x,
            region_z: self.region_z,
            local_x: self.local_x,
            local_z: self.local_z,
            finished: self.finished,
        }
    }
}

/// Memoized horizontal span of the circle for one row.
#[derive(Debug, Clone)]
struct CircleRows {
    center_x: i32,
    center_z: i32,
    radius: i32,
    row_z: Option<i32>,
    row_min_x: i32,
    row_max_x: i32,
}

impl CircleRows {
    fn new(center_x: i32, center_z: i32, radius: i32) -> Self {
        Self {
            center_x,
            center_z,
            radius,
            row_z: None,
            row_min_x: 1,
            row_max_x: 0,
        }
    }

    fn contains(&mut self, key: ChunkKey) -> bool {
        let z = key.z();
        if self.row_z != Some(z) {
            self.row_z = Some(z);
            match circle_half_width(self.radius, i64::from(z) - i64::from(self.center_z)) {
                Some(dx) => {
                    self.row_min_x = self.center_x.saturating_sub(dx);
                    self.row_max_x = self.center_x.saturating_add(dx);
                }
                None => {
                    self.row_min_x = 1;
                    self.row_max_x = 0;
                }
            }
        }
        let x = key.x();
        x >= self.row_min_x && x <= self.row_max_x
    }
}

/// Half-width of a circle row at vertical offset `dz`, or `None` outside it.
///
/// Uses `floor(sqrt(r² - dz²))` in floating point so totals and traversal
/// agree with snapshots written by earlier versions.
pub(crate) fn circle_half_width(radius: i32, dz: i64) -> Option<i32> {
    let r = i64::from(radius);
    if dz.abs() > r {
        return None;
    }
    Some(((r * r - dz * dz) as f64).sqrt() as i32)
}

/// Stateful iterator over every chunk of an area, exactly once.
#[derive(Debug, Clone)]
pub struct Cursor {
    raster: RegionRaster,
    circle: Option<CircleRows>,
}

impl Cursor {
    /// Create a cursor for `area`, optionally resuming from `resume`.
    pub fn new(area: &Area, resume: Option<CursorState>) -> Self {
        let b = area.bounds();
        let raster = RegionRaster::new(b.min_x, b.min_z, b.max_x, b.max_z, resume);
        let circle = match *area.shape() {
            Shape::Circle { center_x, center_z, radius } => {
                Some(CircleRows::new(center_x, center_z, radius))
            }
            _ => None,
        };
        Self { raster, circle }
    }

    /// Next chunk in traversal order, or `None` once the area is exhausted.
    pub fn next_key(&mut self) -> Option<ChunkKey> {
        loop {
            let key = self.raster.next_key()?;
            if let Some(rows) = self.circle.as_mut() {
                if !rows.contains(key) {
                    continue;
                }
            }
            return Some(key);
        }
    }

    /// True once `next_key` has reported the end of the area.
    pub fn is_finished(&self) -> bool {
        self.raster.finished
    }

    /// Position after the last emitted key.
    pub fn state(&self) -> CursorState {
        self.raster.state()
    }
}

impl Iterator for Cursor {
    type Item = ChunkKey;

    fn next(&mut self) -> Option<ChunkKey> {
        self.next_key()
    }
}
