//! Simulated host for driving jobs from the command line.
//!
//! Requests complete a fixed number of host ticks after they are made.
//! The reported tick time grows with the number of chunks completed in
//! the last tick, so the limiter has something real to react to.

use std::collections::VecDeque;
use std::path::PathBuf;

use pregen_core::ChunkKey;
use pregen_scheduler::{ChunkHost, CompletionTicket, HostError};
use pregen_state::WorldId;

/// Knobs of the simulated host.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Host ticks between request and completion.
    pub latency_ticks: u64,
    /// Tick time with no generation load.
    pub base_tick_ms: f64,
    /// Extra tick time per chunk completed in a tick.
    pub cost_per_chunk_ms: f64,
    /// Fail every n-th request; 0 never fails.
    pub fail_every: u64,
    pub region_dir: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            latency_ticks: 2,
            base_tick_ms: 5.0,
            cost_per_chunk_ms: 0.05,
            fail_every: 0,
            region_dir: None,
        }
    }
}

/// In-process [`ChunkHost`] with a deterministic completion schedule.
pub struct SimulatedHost {
    world: WorldId,
    config: SimConfig,
    tick: u64,
    tick_ms: f64,
    pending: VecDeque<(u64, CompletionTicket)>,
    requested: u64,
    generated: u64,
    unloaded: u64,
}

impl SimulatedHost {
    pub fn new(world: WorldId, config: SimConfig) -> Self {
        Self {
            world,
            tick_ms: config.base_tick_ms,
            config,
            tick: 0,
            pending: VecDeque::new(),
            requested: 0,
            generated: 0,
            unloaded: 0,
        }
    }

    /// Advance one host tick, completing every request that is due.
    pub fn advance(&mut self) {
        self.tick += 1;
        let mut completed = 0u64;
        while self.pending.front().is_some_and(|(due, _)| *due <= self.tick) {
            if let Some((_, ticket)) = self.pending.pop_front() {
                ticket.complete();
                completed += 1;
            }
        }
        self.generated += completed;
        self.tick_ms = self.config.base_tick_ms + self.config.cost_per_chunk_ms * completed as f64;
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn generated(&self) -> u64 {
        self.generated
    }

    pub fn unloaded(&self) -> u64 {
        self.unloaded
    }
}

impl ChunkHost for SimulatedHost {
    fn tick_time_ms(&self) -> f64 {
        self.tick_ms
    }

    fn has_world(&self, world: &WorldId) -> bool {
        *world == self.world
    }

    fn region_dir(&self, _world: &WorldId) -> Option<PathBuf> {
        self.config.region_dir.clone()
    }

    fn request_chunk(
        &mut self,
        _world: &WorldId,
        _key: ChunkKey,
        _urgent: bool,
        ticket: CompletionTicket,
    ) {
        self.requested += 1;
        if self.config.fail_every > 0 && self.requested % self.config.fail_every == 0 {
            ticket.fail();
            return;
        }
        self.pending.push_back((self.tick + self.config.latency_ticks, ticket));
    }

    fn unload_chunk(&mut self, _world: &WorldId, _key: ChunkKey) -> Result<(), HostError> {
        self.unloaded += 1;
        Ok(())
    }

    fn request_unload(&mut self, _world: &WorldId, _key: ChunkKey) -> Result<(), HostError> {
        self.unloaded += 1;
        Ok(())
    }

    fn begin_tick(&mut self) {
        self.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pregen_core::{Area, Settings};
    use pregen_scheduler::{JobManager, JobSummary};
    use pregen_state::JobStore;
    use uuid::Uuid;

    fn manager(dir: &std::path::Path, world: Uuid, config: SimConfig) -> JobManager<SimulatedHost> {
        let store = JobStore::open(dir).unwrap();
        JobManager::new(SimulatedHost::new(world, config), Settings::default(), store)
    }

    fn run(config: SimConfig, area: Area) -> (JobManager<SimulatedHost>, JobSummary) {
        let dir = tempfile::tempdir().unwrap();
        let world = Uuid::new_v4();
        let mut manager = manager(dir.path(), world, config);
        manager.start(world, area, None).unwrap();
        for _ in 0..10_000 {
            manager.host_mut().advance();
            if let Some(summary) = manager.tick() {
                return (manager, summary);
            }
        }
        panic!("simulated job did not finish");
    }

    #[test]
    fn completes_after_latency() {
        let (manager, summary) = run(SimConfig::default(), Area::square(0, 0, 3));
        assert_eq!(summary.done, 49);
        assert_eq!(summary.errors, 0);
        assert_eq!(manager.host().generated(), 49);
        assert_eq!(manager.host().pending(), 0);
    }

    #[test]
    fn injected_failures_are_counted() {
        let config = SimConfig {
            fail_every: 5,
            ..SimConfig::default()
        };
        let (_, summary) = run(config, Area::rect(0, 0, 9, 0));
        assert_eq!(summary.done, 10);
        assert_eq!(summary.errors, 2);
    }

    #[test]
    fn tick_time_tracks_load() {
        let dir = tempfile::tempdir().unwrap();
        let world = Uuid::new_v4();
        let config = SimConfig {
            latency_ticks: 1,
            base_tick_ms: 10.0,
            cost_per_chunk_ms: 1.0,
            ..SimConfig::default()
        };
        let mut manager = manager(dir.path(), world, config);
        manager.start(world, Area::rect(0, 0, 3, 0), None).unwrap();

        assert_eq!(manager.host().tick_time_ms(), 10.0);
        manager.tick();
        assert_eq!(manager.host().pending(), 4);
        manager.host_mut().advance();
        assert_eq!(manager.host().tick_time_ms(), 14.0);
        manager.host_mut().advance();
        assert_eq!(manager.host().tick_time_ms(), 10.0);
    }
}
