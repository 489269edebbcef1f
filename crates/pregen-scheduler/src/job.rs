//! Generation job — the adaptive scheduler.
//!
//! One job walks one [`Area`] of one world. The host drives it by calling
//! [`GenerationJob::tick`] once per host tick; every step inside a tick is
//! bounded by a per-tick cap so a tick does a fixed amount of work.
//!
//! # Tick
//!
//! ```text
//! (factor, guard_paused) = limiter(host tick time)
//! max_concurrent = max(1, floor(base.max_concurrent * factor))
//! dispatch_cap   = max(1, floor(base.dispatch_per_tick * factor))
//!
//! inbox       → completion queue          (one message per finished ticket)
//! completions → post action, done += 1    (≤ complete_per_tick)
//! unloads     → host release requests     (≤ unload_per_tick)
//! if !manual_paused && !guard_paused:
//!     cursor  → skip cache | host request (≤ min(max_concurrent - in_flight, dispatch_cap))
//! rate, autosave, progress log
//! cursor exhausted && in_flight == 0 && queues empty → Finished
//! ```
//!
//! # Accounting
//!
//! `in_flight` goes up once per dispatched chunk and down once when its
//! ticket's message is drained, whatever the outcome. A failed chunk still
//! counts toward `done`, plus one `errors`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pregen_core::{Area, ChunkKey, Cursor, KeyQueue, Settings, SkipMode, UnloadMode};
use pregen_limiter::FeedbackLimiter;
use pregen_skip::RegionHeaderCache;
use pregen_state::{epoch_millis, JobState, JobStore, WorldId};
use tracing::{debug, info, warn};

use crate::host::ChunkHost;
use crate::status::{self, JobStatus};
use crate::ticket::{self, CompletionTicket, HandlerPool, Inbox, Outbox, Outcome};

/// Window over which the throughput rate is measured.
const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Smallest handler pool a job keeps.
const MIN_POOL: usize = 32;

/// Smallest initial queue capacity.
const MIN_QUEUE: usize = 64;

/// What to do with the snapshot when a job is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Keep a snapshot so the job resumes on the next start.
    Persist,
    /// Delete the snapshot.
    Clear,
}

/// Final counters of a job that finished or was stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub world: WorldId,
    pub shape: &'static str,
    pub done: u64,
    pub total: u64,
    pub skipped: u64,
    pub errors: u64,
    pub elapsed: Duration,
}

/// Events a tick reports to the job's owner.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// Every chunk is accounted for; the job should be dropped.
    Finished(JobSummary),
}

/// A running pre-generation job.
pub struct GenerationJob {
    settings: Settings,
    world: WorldId,
    area: Area,
    starter: Option<String>,
    store: JobStore,
    region_dir: Option<PathBuf>,

    cursor: Cursor,
    total: u64,
    done: u64,
    skipped: u64,
    errors: u64,
    in_flight: u32,
    manual_paused: bool,
    guard_paused: bool,
    finished: bool,

    factor: f64,
    max_concurrent: u32,
    dispatch_cap: u32,
    tick_ms: f64,

    started_at_ms: u64,
    rate: f64,
    rate_at: Instant,
    rate_done: u64,
    saved_at: Instant,
    logged_at: Instant,

    limiter: FeedbackLimiter,
    regions: Option<RegionHeaderCache>,
    completions: KeyQueue,
    unloads: KeyQueue,
    pool: HandlerPool,
    outbox: Outbox,
    inbox: Inbox,
}

impl GenerationJob {
    /// Create a job over `area`. Nothing is dispatched until the first tick.
    pub fn new(
        settings: Settings,
        world: WorldId,
        area: Area,
        starter: Option<String>,
        region_dir: Option<PathBuf>,
        store: JobStore,
    ) -> Self {
        let now = Instant::now();
        let backlog = MIN_QUEUE.max(settings.limits.max_concurrent as usize * 2);
        let (outbox, inbox) = ticket::inbox();
        Self {
            limiter: FeedbackLimiter::new(settings.limiter),
            regions: build_region_cache(&settings, region_dir.as_deref()),
            completions: KeyQueue::with_capacity(backlog),
            unloads: KeyQueue::with_capacity(backlog),
            pool: HandlerPool::with_capacity(pool_size(&settings)),
            max_concurrent: settings.limits.max_concurrent,
            dispatch_cap: settings.limits.dispatch_per_tick,
            settings,
            world,
            cursor: area.cursor(None),
            total: area.total_chunks(),
            area,
            starter,
            store,
            region_dir,
            done: 0,
            skipped: 0,
            errors: 0,
            in_flight: 0,
            manual_paused: false,
            guard_paused: false,
            finished: false,
            factor: 1.0,
            tick_ms: 0.0,
            started_at_ms: epoch_millis(),
            rate: 0.0,
            rate_at: now,
            rate_done: 0,
            saved_at: now,
            logged_at: now,
            outbox,
            inbox,
        }
    }

    /// Take over counters and cursor position from a snapshot.
    pub fn restore(&mut self, state: &JobState) {
        self.done = state.done;
        self.skipped = state.skipped;
        self.errors = state.errors;
        self.started_at_ms = state.started_at_ms;
        self.cursor = self.area.cursor(Some(state.cursor));
        debug!(world = %self.world, done = self.done, cursor = ?state.cursor, "job state restored");
    }

    /// Reset timers, announce the job, and write the first snapshot.
    pub fn start(&mut self, resumed: bool) {
        let now = Instant::now();
        self.rate_at = now;
        self.rate_done = self.done;
        self.saved_at = now;
        self.logged_at = now;

        if resumed {
            info!(
                world = %self.world,
                shape = self.area.name(),
                done = self.done,
                total = self.total,
                "generation auto-resumed"
            );
        } else {
            info!(
                world = %self.world,
                shape = self.area.name(),
                total = self.total,
                starter = ?self.starter,
                "generation started"
            );
        }
        self.persist();
    }

    pub fn pause(&mut self) {
        self.manual_paused = true;
        info!(world = %self.world, done = self.done, "generation paused");
        self.persist();
    }

    pub fn resume(&mut self) {
        self.manual_paused = false;
        info!(world = %self.world, done = self.done, "generation resumed");
        self.persist();
    }

    /// End the job. In-flight tickets still report into a closed inbox.
    pub fn stop(self, mode: StopMode) -> JobSummary {
        match mode {
            StopMode::Persist => self.persist(),
            StopMode::Clear => self.clear_snapshot(),
        }
        let summary = self.summary();
        info!(
            world = %summary.world,
            done = summary.done,
            total = summary.total,
            in_flight = self.in_flight,
            ?mode,
            "generation stopped"
        );
        summary
    }

    /// Apply new settings to the running job.
    pub fn update(&mut self, settings: Settings) {
        self.regions = build_region_cache(&settings, self.region_dir.as_deref());
        self.limiter.update(settings.limiter);
        self.pool.grow_to(pool_size(&settings));
        self.settings = settings;
        debug!(world = %self.world, "job settings updated");
    }

    pub fn status(&self) -> JobStatus {
        JobStatus {
            world: self.world,
            shape: self.area.name(),
            done: self.done,
            total: self.total,
            percent: status::percent(self.done, self.total),
            rate: self.rate,
            eta: status::eta(self.done, self.total, self.rate),
            in_flight: self.in_flight,
            queue_depth: self.queue_depth(),
            factor: self.factor,
            skipped: self.skipped,
            errors: self.errors,
            tick_ms: self.tick_ms,
            elapsed: self.elapsed(),
            manual_paused: self.manual_paused,
            guard_paused: self.guard_paused,
        }
    }

    /// Run one scheduling cycle.
    pub fn tick<H: ChunkHost>(&mut self, host: &mut H) -> Option<JobEvent> {
        self.tick_at(host, Instant::now())
    }

    /// Run one scheduling cycle as of `now`.
    pub fn tick_at<H: ChunkHost>(&mut self, host: &mut H, now: Instant) -> Option<JobEvent> {
        if self.finished {
            return None;
        }

        self.update_limiter(host.tick_time_ms(), now);
        self.drain_inbox();
        self.pump_completions(host);
        self.pump_unloads(host);
        if !self.is_paused() {
            self.dispatch(host);
        }
        self.update_rate(now);

        let autosave = Duration::from_secs(u64::from(self.settings.autosave_seconds));
        if !autosave.is_zero() && now.saturating_duration_since(self.saved_at) >= autosave {
            self.saved_at = now;
            self.persist();
        }

        let log_every = Duration::from_secs(u64::from(self.settings.log_progress_seconds));
        if !log_every.is_zero() && now.saturating_duration_since(self.logged_at) >= log_every {
            self.logged_at = now;
            info!(
                world = %self.world,
                shape = self.area.name(),
                done = self.done,
                total = self.total,
                in_flight = self.in_flight,
                queued = self.queue_depth(),
                tick_ms = self.tick_ms,
                factor = self.factor,
                "generation progress"
            );
        }

        if self.cursor.is_finished() && self.in_flight == 0 && self.queue_depth() == 0 {
            return Some(JobEvent::Finished(self.finish()));
        }
        None
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    pub fn is_paused(&self) -> bool {
        self.manual_paused || self.guard_paused
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Snapshot of the job as it would be persisted now.
    pub fn snapshot(&self) -> JobState {
        JobState {
            world_id: self.world,
            starter_id: self.starter.clone(),
            started_at_ms: self.started_at_ms,
            done: self.done,
            skipped: self.skipped,
            errors: self.errors,
            area: self.area,
            cursor: self.cursor.state(),
        }
    }

    fn update_limiter(&mut self, tick_ms: f64, now: Instant) {
        self.tick_ms = tick_ms;
        let state = self.limiter.tick_at(tick_ms, now);
        self.factor = state.factor;
        self.guard_paused = state.paused;

        let limits = self.settings.limits;
        self.max_concurrent = scaled(limits.max_concurrent, state.factor);
        self.dispatch_cap = scaled(limits.dispatch_per_tick, state.factor);
    }

    fn drain_inbox(&mut self) {
        while self.in_flight > 0 {
            let Ok(msg) = self.inbox.try_recv() else {
                break;
            };
            let Some(key) = self.pool.release(msg.slot) else {
                continue;
            };
            self.in_flight -= 1;
            match msg.outcome {
                Outcome::Completed => self.completions.push(key),
                Outcome::Failed => {
                    self.done += 1;
                    self.errors += 1;
                    warn!(world = %self.world, %key, "chunk request failed");
                }
            }
        }
    }

    fn pump_completions<H: ChunkHost>(&mut self, host: &mut H) {
        for _ in 0..self.settings.limits.complete_per_tick {
            let Some(key) = self.completions.pop() else {
                break;
            };
            match self.settings.unload_mode {
                UnloadMode::None => {}
                UnloadMode::Request => self.unloads.push(key),
                UnloadMode::Immediate => {
                    if let Err(e) = host.unload_chunk(&self.world, key) {
                        self.errors += 1;
                        warn!(world = %self.world, %key, error = %e, "chunk unload failed");
                    }
                }
            }
            self.done += 1;
        }
    }

    fn pump_unloads<H: ChunkHost>(&mut self, host: &mut H) {
        for _ in 0..self.settings.limits.unload_per_tick {
            let Some(key) = self.unloads.pop() else {
                break;
            };
            if let Err(e) = host.request_unload(&self.world, key) {
                self.errors += 1;
                warn!(world = %self.world, %key, error = %e, "chunk unload request failed");
            }
        }
    }

    fn dispatch<H: ChunkHost>(&mut self, host: &mut H) {
        let available = self.max_concurrent.saturating_sub(self.in_flight);
        if available == 0 {
            return;
        }
        let quota = available.min(self.dispatch_cap);
        // Keys skipped from the region cache are cheap but still bounded.
        let mut skip_budget = self.settings.limits.dispatch_per_tick;
        let urgent = self.settings.urgent_requests;

        let mut dispatched = 0;
        while dispatched < quota {
            let Some(key) = self.cursor.next_key() else {
                break;
            };
            if self.already_generated(key) {
                self.done += 1;
                self.skipped += 1;
                skip_budget -= 1;
                if skip_budget == 0 {
                    break;
                }
                continue;
            }

            let slot = self.pool.acquire(key);
            self.in_flight += 1;
            dispatched += 1;
            let ticket = CompletionTicket::new(slot, key, self.outbox.clone());
            host.request_chunk(&self.world, key, urgent, ticket);
        }
    }

    fn already_generated(&mut self, key: ChunkKey) -> bool {
        match self.regions.as_mut() {
            Some(cache) => cache.has_chunk(key),
            None => false,
        }
    }

    fn update_rate(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.rate_at);
        if dt < RATE_WINDOW {
            return;
        }
        self.rate = self.done.saturating_sub(self.rate_done) as f64 / dt.as_secs_f64();
        self.rate_at = now;
        self.rate_done = self.done;
    }

    fn finish(&mut self) -> JobSummary {
        self.finished = true;
        self.manual_paused = true;
        self.clear_snapshot();
        let summary = self.summary();
        info!(
            world = %summary.world,
            done = summary.done,
            total = summary.total,
            skipped = summary.skipped,
            errors = summary.errors,
            elapsed_secs = summary.elapsed.as_secs(),
            "generation finished"
        );
        summary
    }

    fn summary(&self) -> JobSummary {
        JobSummary {
            world: self.world,
            shape: self.area.name(),
            done: self.done,
            total: self.total,
            skipped: self.skipped,
            errors: self.errors,
            elapsed: self.elapsed(),
        }
    }

    fn elapsed(&self) -> Duration {
        Duration::from_millis(epoch_millis().saturating_sub(self.started_at_ms))
    }

    fn queue_depth(&self) -> usize {
        self.completions.len() + self.unloads.len()
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.snapshot()) {
            warn!(world = %self.world, error = %e, "failed to save job snapshot");
        }
    }

    fn clear_snapshot(&self) {
        if let Err(e) = self.store.clear() {
            warn!(world = %self.world, error = %e, "failed to clear job snapshot");
        }
    }
}

/// `max(1, floor(base * factor))`.
fn scaled(base: u32, factor: f64) -> u32 {
    ((f64::from(base) * factor).floor() as u32).max(1)
}

fn pool_size(settings: &Settings) -> usize {
    MIN_POOL.max(settings.limits.max_concurrent as usize * 2)
}

fn build_region_cache(settings: &Settings, dir: Option<&Path>) -> Option<RegionHeaderCache> {
    if settings.skip_mode == SkipMode::None || settings.region_cache_size == 0 {
        return None;
    }
    Some(RegionHeaderCache::new(dir?, settings.region_cache_size))
}
