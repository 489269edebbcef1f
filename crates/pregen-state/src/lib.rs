//! pregen-state — crash-recovery snapshot of the running job.
//!
//! A single JSON document per store directory holds everything needed to
//! resume: world, starter, counters, the area and the cursor position.
//! Writes go to a temporary file that is renamed over the snapshot, so a
//! crash mid-write leaves the previous snapshot intact.

pub mod error;
pub mod store;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{JobStore, SNAPSHOT_FILE};
pub use types::{epoch_millis, JobState, WorldId};
