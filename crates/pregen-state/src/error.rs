//! Error types for the job snapshot store.

use thiserror::Error;

/// Result type alias for snapshot operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors reading or writing the persisted job snapshot.
///
/// Auto-resume treats every variant as "nothing to resume".
#[derive(Debug, Error)]
pub enum StateError {
    #[error("snapshot I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("invalid world id: {0:?}")]
    InvalidWorldId(String),
}
