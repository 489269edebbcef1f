//! Packed chunk coordinates.
//!
//! A chunk is addressed by a pair of signed 32-bit coordinates. Queues,
//! cursors, and caches pass them around as one `i64` with `x` in the upper
//! half and `z` in the lower half.

use std::fmt;

/// Width and depth of a region, in chunks.
pub const REGION_SIZE: i32 = 32;

/// log2 of [`REGION_SIZE`].
pub const REGION_SHIFT: u32 = 5;

/// A chunk coordinate packed into 64 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(i64);

impl ChunkKey {
    /// Raw sentinel for "no more keys".
    ///
    /// Only meaningful at raw `i64` boundaries; in Rust APIs the end of a
    /// traversal is `None`.
    pub const END: i64 = i64::MIN;

    /// Pack `(x, z)` into a key.
    #[inline]
    pub const fn pack(x: i32, z: i32) -> Self {
        Self(((x as i64) << 32) | (z as u32 as i64))
    }

    /// Rebuild a key from its raw form.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn x(self) -> i32 {
        (self.0 >> 32) as i32
    }

    #[inline]
    pub const fn z(self) -> i32 {
        self.0 as i32
    }

    /// Unpack into `(x, z)`.
    #[inline]
    pub const fn unpack(self) -> (i32, i32) {
        (self.x(), self.z())
    }

    /// Coordinates of the region containing this chunk.
    #[inline]
    pub const fn region(self) -> (i32, i32) {
        (self.x() >> REGION_SHIFT, self.z() >> REGION_SHIFT)
    }

    /// Index of this chunk within its region, row-major (`z` outer).
    #[inline]
    pub const fn local_index(self) -> usize {
        (((self.z() & (REGION_SIZE - 1)) << REGION_SHIFT) | (self.x() & (REGION_SIZE - 1))) as usize
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x(), self.z())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_extremes() {
        let values = [i32::MIN, i32::MIN + 1, -1, 0, 1, 31, 32, -33, i32::MAX - 1, i32::MAX];
        for &x in &values {
            for &z in &values {
                let key = ChunkKey::pack(x, z);
                assert_eq!(key.unpack(), (x, z), "round trip failed for ({x}, {z})");
                assert_eq!(ChunkKey::from_raw(key.raw()), key);
            }
        }
    }

    #[test]
    fn negative_z_does_not_bleed_into_x() {
        let key = ChunkKey::pack(7, -1);
        assert_eq!(key.x(), 7);
        assert_eq!(key.z(), -1);
    }

    #[test]
    fn region_uses_floor_division() {
        assert_eq!(ChunkKey::pack(0, 0).region(), (0, 0));
        assert_eq!(ChunkKey::pack(31, 31).region(), (0, 0));
        assert_eq!(ChunkKey::pack(32, -1).region(), (1, -1));
        assert_eq!(ChunkKey::pack(-32, -33).region(), (-1, -2));
    }

    #[test]
    fn local_index_is_row_major() {
        assert_eq!(ChunkKey::pack(0, 0).local_index(), 0);
        assert_eq!(ChunkKey::pack(1, 0).local_index(), 1);
        assert_eq!(ChunkKey::pack(0, 1).local_index(), 32);
        assert_eq!(ChunkKey::pack(-1, -1).local_index(), 1023);
    }

    #[test]
    fn display_shows_coordinates() {
        assert_eq!(ChunkKey::pack(-3, 4).to_string(), "(-3, 4)");
    }
}
