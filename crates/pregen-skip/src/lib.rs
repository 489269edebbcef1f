//! pregen-skip — avoid dispatching chunks that are already on disk.
//!
//! Reads the 4 KiB location table of each region file once, keeps the
//! resulting 1024-bit presence set in a bounded LRU, and answers
//! per-chunk presence queries from it.
//!
//! # Failure model
//!
//! Missing or unreadable region files count as "nothing present". A false
//! negative costs one redundant dispatch; a false positive would silently
//! drop work, so none are ever produced.

pub mod cache;
pub mod region;

pub use cache::RegionHeaderCache;
pub use region::{region_path, RegionBits, HEADER_BYTES};
