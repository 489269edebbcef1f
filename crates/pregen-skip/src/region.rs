//! Region-file headers and presence bitsets.
//!
//! A region file starts with a 4096-byte location table: 1024 big-endian
//! 4-byte entries, one per chunk slot in row-major order (`z` outer). The
//! first three bytes of an entry are the sector offset of the chunk's data;
//! a zero offset means the chunk was never written.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use pregen_core::{ChunkKey, REGION_SIZE};

/// Size of the location table at the start of every region file.
pub const HEADER_BYTES: usize = 4096;

const SLOTS: usize = (REGION_SIZE * REGION_SIZE) as usize;
const WORDS: usize = SLOTS / 64;

/// Presence bits for the 1024 chunk slots of one region.
#[derive(Clone, PartialEq, Eq)]
pub struct RegionBits {
    words: [u64; WORDS],
}

impl RegionBits {
    /// A region with no chunks present.
    pub const EMPTY: RegionBits = RegionBits { words: [0; WORDS] };

    /// Build the bitset from a raw location table.
    pub fn from_header(header: &[u8; HEADER_BYTES]) -> Self {
        let mut words = [0u64; WORDS];
        for (slot, entry) in header.chunks_exact(4).enumerate() {
            let offset = u32::from_be_bytes([0, entry[0], entry[1], entry[2]]);
            if offset != 0 {
                words[slot >> 6] |= 1 << (slot & 63);
            }
        }
        Self { words }
    }

    /// Whether the chunk's slot in this region is occupied.
    ///
    /// Only the chunk's position within its region is consulted.
    pub fn has(&self, key: ChunkKey) -> bool {
        let slot = key.local_index();
        self.words[slot >> 6] & (1 << (slot & 63)) != 0
    }

    pub fn count(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }
}

impl std::fmt::Debug for RegionBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionBits").field("present", &self.count()).finish()
    }
}

/// Path of the region file holding region `(rx, rz)`.
pub fn region_path(dir: &Path, rx: i32, rz: i32) -> PathBuf {
    dir.join(format!("r.{rx}.{rz}.mca"))
}

/// Read the location table of a region file.
pub fn read_header(path: &Path, buf: &mut [u8; HEADER_BYTES]) -> io::Result<()> {
    let mut file = File::open(path)?;
    file.read_exact(buf)
}
