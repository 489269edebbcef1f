//! The host process the scheduler generates chunks in.
//!
//! The host owns chunk materialization and storage. The scheduler only
//! asks it for chunks, hands it a [`CompletionTicket`] per request, and
//! releases chunks once they are done.

use std::path::PathBuf;

use pregen_core::ChunkKey;
use pregen_state::WorldId;

use crate::error::HostError;
use crate::ticket::CompletionTicket;

/// Collaborator interface implemented by the embedding host.
pub trait ChunkHost {
    /// Latest measured host tick time, in milliseconds.
    fn tick_time_ms(&self) -> f64;

    /// Whether `world` is currently loaded.
    fn has_world(&self, world: &WorldId) -> bool;

    /// Directory holding the world's region files, if it has one.
    fn region_dir(&self, world: &WorldId) -> Option<PathBuf>;

    /// Start loading or generating `key` asynchronously.
    ///
    /// The host must eventually call [`CompletionTicket::complete`] (or
    /// [`CompletionTicket::fail`]) on `ticket`. Dropping it counts as a
    /// failed unit.
    fn request_chunk(
        &mut self,
        world: &WorldId,
        key: ChunkKey,
        urgent: bool,
        ticket: CompletionTicket,
    );

    /// Unload a chunk right away, saving it.
    fn unload_chunk(&mut self, world: &WorldId, key: ChunkKey) -> Result<(), HostError>;

    /// Ask the host to unload a chunk when convenient.
    fn request_unload(&mut self, world: &WorldId, key: ChunkKey) -> Result<(), HostError>;

    /// Called by [`JobManager::run`](crate::JobManager::run) at the start
    /// of every host tick, before the job is ticked.
    fn begin_tick(&mut self) {}
}
