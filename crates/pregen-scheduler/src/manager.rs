//! Job manager — owns the host and at most one generation job.
//!
//! The manager is the only place a [`GenerationJob`] is created or
//! dropped. A finishing job reports [`JobEvent::Finished`] from its tick
//! and the manager releases the slot in response.

use std::time::{Duration, Instant};

use pregen_core::{Area, Settings};
use pregen_state::{JobState, JobStore, WorldId};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{SchedulerError, SchedulerResult};
use crate::host::ChunkHost;
use crate::job::{GenerationJob, JobEvent, JobSummary, StopMode};
use crate::status::JobStatus;

/// Operator request applied by [`JobManager::run`] between ticks.
#[derive(Debug)]
pub enum Control {
    Pause,
    Resume,
    /// Stop the job and discard its snapshot.
    Stop,
    Reload(Settings),
    Status(oneshot::Sender<SchedulerResult<JobStatus>>),
}

/// Why [`JobManager::run`] returned.
#[derive(Debug, Clone, PartialEq)]
pub enum RunExit {
    /// The job covered its whole area.
    Finished(JobSummary),
    /// [`Control::Stop`] ended the job.
    Stopped(JobSummary),
    /// Shutdown was requested; the job, if any, was persisted.
    Shutdown(Option<JobSummary>),
}

/// Single-slot owner of the active generation job.
pub struct JobManager<H> {
    host: H,
    settings: Settings,
    store: JobStore,
    job: Option<GenerationJob>,
}

impl<H: ChunkHost> JobManager<H> {
    pub fn new(host: H, settings: Settings, store: JobStore) -> Self {
        Self {
            host,
            settings,
            store,
            job: None,
        }
    }

    /// Start generating `area` in `world`.
    pub fn start(
        &mut self,
        world: WorldId,
        area: Area,
        starter: Option<String>,
    ) -> SchedulerResult<()> {
        if self.job.is_some() {
            return Err(SchedulerError::JobAlreadyRunning);
        }
        let mut job = self.new_job(world, area, starter)?;
        job.start(false);
        self.job = Some(job);
        Ok(())
    }

    pub fn pause(&mut self) -> SchedulerResult<()> {
        self.job_mut()?.pause();
        Ok(())
    }

    pub fn resume(&mut self) -> SchedulerResult<()> {
        self.job_mut()?.resume();
        Ok(())
    }

    /// Stop the job and discard its snapshot.
    pub fn stop(&mut self) -> SchedulerResult<JobSummary> {
        let job = self.job.take().ok_or(SchedulerError::JobNotRunning)?;
        Ok(job.stop(StopMode::Clear))
    }

    pub fn status(&self) -> SchedulerResult<JobStatus> {
        self.job
            .as_ref()
            .map(GenerationJob::status)
            .ok_or(SchedulerError::JobNotRunning)
    }

    /// Swap in new settings for future jobs and the running one.
    pub fn reload(&mut self, settings: Settings) {
        if let Some(job) = self.job.as_mut() {
            job.update(settings.clone());
        }
        self.settings = settings;
        info!("settings reloaded");
    }

    /// Drive the active job for one host tick.
    pub fn tick(&mut self) -> Option<JobSummary> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<JobSummary> {
        let job = self.job.as_mut()?;
        match job.tick_at(&mut self.host, now)? {
            JobEvent::Finished(summary) => {
                self.job = None;
                Some(summary)
            }
        }
    }

    /// Resume the persisted job, if there is a usable one.
    ///
    /// Any problem with the snapshot means there is nothing to resume.
    pub fn try_auto_resume(&mut self) -> bool {
        if self.job.is_some() {
            return false;
        }
        let state = match self.store.load() {
            Ok(Some(state)) => state,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "job snapshot unusable, not resuming");
                return false;
            }
        };
        match self.resume_from(&state) {
            Ok(()) => true,
            Err(e) => {
                warn!(world = %state.world_id, error = %e, "cannot resume job");
                false
            }
        }
    }

    /// Auto-resume if the settings ask for it.
    pub fn on_startup(&mut self) -> bool {
        if !self.settings.auto_resume_on_start {
            debug!("auto-resume disabled");
            return false;
        }
        self.try_auto_resume()
    }

    /// Stop the active job, keeping its snapshot for the next start.
    pub fn shutdown(&mut self) -> Option<JobSummary> {
        self.job.take().map(|job| job.stop(StopMode::Persist))
    }

    /// Tick every `period`, applying operator [`Control`]s between ticks.
    ///
    /// Returns when the job finishes, when [`Control::Stop`] ends it, or
    /// when `shutdown` flips, in which case the job is persisted. Without a
    /// job the loop idles until shutdown.
    pub async fn run(
        &mut self,
        period: Duration,
        mut control: mpsc::UnboundedReceiver<Control>,
        mut shutdown: watch::Receiver<bool>,
    ) -> RunExit {
        info!(period_ms = period.as_millis() as u64, "job manager started");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.host.begin_tick();
                    if let Some(summary) = self.tick() {
                        return RunExit::Finished(summary);
                    }
                }
                Some(request) = control.recv() => {
                    if let Some(exit) = self.apply(request) {
                        return exit;
                    }
                }
                _ = shutdown.changed() => {
                    info!("job manager shutting down");
                    return RunExit::Shutdown(self.shutdown());
                }
            }
        }
    }

    fn apply(&mut self, request: Control) -> Option<RunExit> {
        let result = match request {
            Control::Pause => self.pause(),
            Control::Resume => self.resume(),
            Control::Reload(settings) => {
                self.reload(settings);
                Ok(())
            }
            Control::Status(reply) => {
                let _ = reply.send(self.status());
                Ok(())
            }
            Control::Stop => match self.stop() {
                Ok(summary) => return Some(RunExit::Stopped(summary)),
                Err(e) => Err(e),
            },
        };
        if let Err(e) = result {
            warn!(error = %e, "control request ignored");
        }
        None
    }

    pub fn is_running(&self) -> bool {
        self.job.is_some()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    fn resume_from(&mut self, state: &JobState) -> SchedulerResult<()> {
        let mut job = self.new_job(state.world_id, state.area, state.starter_id.clone())?;
        job.restore(state);
        job.start(true);
        self.job = Some(job);
        Ok(())
    }

    fn new_job(
        &self,
        world: WorldId,
        area: Area,
        starter: Option<String>,
    ) -> SchedulerResult<GenerationJob> {
        if !self.host.has_world(&world) {
            return Err(SchedulerError::WorldNotFound(world));
        }
        let region_dir = self.host.region_dir(&world);
        Ok(GenerationJob::new(
            self.settings.clone(),
            world,
            area,
            starter,
            region_dir,
            self.store.clone(),
        ))
    }

    fn job_mut(&mut self) -> SchedulerResult<&mut GenerationJob> {
        self.job.as_mut().ok_or(SchedulerError::JobNotRunning)
    }
}
