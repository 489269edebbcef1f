//! Scheduler error types.

use pregen_state::WorldId;
use thiserror::Error;

/// Errors returned by job lifecycle operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("a generation job is already running")]
    JobAlreadyRunning,

    #[error("no generation job is running")]
    JobNotRunning,

    #[error("world not found: {0}")]
    WorldNotFound(WorldId),

    #[error("state store error: {0}")]
    State(#[from] pregen_state::StateError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Failure reported by the host for a single chunk operation.
///
/// Counted in the job's `errors`; never propagated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
