//! Region skip cache — answers "is this chunk already on disk?".
//!
//! Region headers are read lazily on first touch and kept in an LRU of at
//! most `capacity` regions: a map from region to bits plus an ordered
//! recency index (`stamp → region`). Any access re-stamps the region; the
//! smallest stamp is evicted first.
//!
//! A missing, short, or unreadable region file is cached as fully absent.
//! That can only cause a redundant dispatch, never a skipped chunk.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use pregen_core::ChunkKey;
use tracing::debug;

use crate::region::{read_header, region_path, RegionBits, HEADER_BYTES};

struct Entry {
    bits: RegionBits,
    stamp: u64,
}

/// LRU of region presence bitsets backed by a region directory.
pub struct RegionHeaderCache {
    dir: PathBuf,
    capacity: usize,
    entries: HashMap<ChunkKey, Entry>,
    /// Recency index: oldest stamp first.
    order: BTreeMap<u64, ChunkKey>,
    next_stamp: u64,
    header: Box<[u8; HEADER_BYTES]>,
}

impl RegionHeaderCache {
    /// Create a cache over `dir` holding at most `capacity` regions (minimum 1).
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            dir: dir.into(),
            capacity,
            entries: HashMap::with_capacity(capacity.min(4096)),
            order: BTreeMap::new(),
            next_stamp: 0,
            header: Box::new([0; HEADER_BYTES]),
        }
    }

    /// True only if the region file records data for this chunk.
    pub fn has_chunk(&mut self, key: ChunkKey) -> bool {
        let (rx, rz) = key.region();
        let region = ChunkKey::pack(rx, rz);
        let stamp = self.bump();

        if let Some(entry) = self.entries.get_mut(&region) {
            self.order.remove(&entry.stamp);
            entry.stamp = stamp;
            self.order.insert(stamp, region);
            return entry.bits.has(key);
        }

        let bits = self.load(rx, rz);
        let present = bits.has(key);
        self.entries.insert(region, Entry { bits, stamp });
        self.order.insert(stamp, region);
        self.evict();
        present
    }

    /// Number of resident regions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether region `(rx, rz)` is resident.
    pub fn contains_region(&self, rx: i32, rz: i32) -> bool {
        self.entries.contains_key(&ChunkKey::pack(rx, rz))
    }

    fn bump(&mut self) -> u64 {
        self.next_stamp += 1;
        self.next_stamp
    }

    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            let Some((_, region)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&region);
            debug!(rx = region.x(), rz = region.z(), "region header evicted");
        }
    }

    fn load(&mut self, rx: i32, rz: i32) -> RegionBits {
        let path = region_path(&self.dir, rx, rz);
        match read_header(&path, &mut self.header) {
            Ok(()) => {
                let bits = RegionBits::from_header(&self.header);
                debug!(rx, rz, present = bits.count(), "region header loaded");
                bits
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => RegionBits::EMPTY,
            Err(e) => {
                debug!(rx, rz, error = %e, "unreadable region header, treating as absent");
                RegionBits::EMPTY
            }
        }
    }
}
