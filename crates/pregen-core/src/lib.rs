//! pregen-core — shared building blocks for chunk pre-generation.
//!
//! - [`ChunkKey`]: a chunk coordinate packed into 64 bits
//! - [`KeyQueue`]: growable FIFO ring of keys
//! - [`Area`]: the shape being generated, with exact chunk totals
//! - [`Cursor`]: resumable region-major traversal of an area
//! - [`Settings`]: resolved configuration, parsed from `pregen.toml`

pub mod area;
pub mod config;
pub mod cursor;
pub mod key;
pub mod queue;

pub use area::{Area, AreaError, Bounds, Shape, WorldBorder};
pub use config::{
    BaseLimits, ConfigError, ConfigResult, LimiterSettings, PregenConfig, Settings, SkipMode,
    UnloadMode,
};
pub use cursor::{Cursor, CursorState};
pub use key::{ChunkKey, REGION_SHIFT, REGION_SIZE};
pub use queue::KeyQueue;
