//! pregen-scheduler — adaptive chunk pre-generation.
//!
//! A [`GenerationJob`] walks an area's cursor and keeps the host busy
//! within per-tick caps scaled by a feedback limiter on host tick time.
//! Completed chunks flow back through owned [`CompletionTicket`]s into
//! the job's inbox, are counted, and optionally released. The
//! [`JobManager`] owns the host and the single job slot, and resumes a
//! persisted job at startup.
//!
//! # Threading
//!
//! Jobs are driven from one task. Tickets are `Send`, so a host may
//! complete them from any thread; completions are only observed on the
//! next tick.

pub mod error;
pub mod host;
pub mod job;
pub mod manager;
pub mod status;
pub mod ticket;

pub use error::{HostError, SchedulerError, SchedulerResult};
pub use host::ChunkHost;
pub use job::{GenerationJob, JobEvent, JobSummary, StopMode};
pub use manager::{Control, JobManager, RunExit};
pub use status::JobStatus;
pub use ticket::{CompletionTicket, HandlerPool, Outcome};
