//! Drives the scheduler through its public API against an in-memory host.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use pregen_core::{Area, BaseLimits, ChunkKey, Settings, UnloadMode};
use pregen_scheduler::{
    ChunkHost, CompletionTicket, Control, HostError, JobManager, JobSummary, RunExit,
    SchedulerError,
};
use tokio::sync::{mpsc, oneshot, watch};
use pregen_state::{JobStore, WorldId};
use uuid::Uuid;

/// Host that completes every request the moment it is made.
struct InstantHost {
    world: WorldId,
    requested: Vec<ChunkKey>,
    host_ticks: u32,
}

impl InstantHost {
    fn new(world: WorldId) -> Self {
        Self {
            world,
            requested: Vec::new(),
            host_ticks: 0,
        }
    }
}

impl ChunkHost for InstantHost {
    fn tick_time_ms(&self) -> f64 {
        5.0
    }

    fn has_world(&self, world: &WorldId) -> bool {
        *world == self.world
    }

    fn region_dir(&self, _world: &WorldId) -> Option<PathBuf> {
        None
    }

    fn request_chunk(
        &mut self,
        _world: &WorldId,
        key: ChunkKey,
        _urgent: bool,
        ticket: CompletionTicket,
    ) {
        self.requested.push(key);
        ticket.complete();
    }

    fn unload_chunk(&mut self, _world: &WorldId, _key: ChunkKey) -> Result<(), HostError> {
        Ok(())
    }

    fn request_unload(&mut self, _world: &WorldId, _key: ChunkKey) -> Result<(), HostError> {
        Ok(())
    }

    fn begin_tick(&mut self) {
        self.host_ticks += 1;
    }
}

fn settings(max_concurrent: u32, dispatch_per_tick: u32) -> Settings {
    Settings {
        limits: BaseLimits {
            max_concurrent,
            dispatch_per_tick,
            complete_per_tick: 4096,
            unload_per_tick: 4096,
        },
        unload_mode: UnloadMode::Request,
        ..Settings::default()
    }
}

fn manager(dir: &std::path::Path, settings: Settings) -> (JobManager<InstantHost>, WorldId) {
    let world = Uuid::new_v4();
    let store = JobStore::open(dir).unwrap();
    (JobManager::new(InstantHost::new(world), settings, store), world)
}

fn tick_until_done(
    manager: &mut JobManager<InstantHost>,
    max_ticks: u32,
) -> Option<(u32, JobSummary)> {
    let t0 = Instant::now();
    for i in 0..max_ticks {
        if let Some(summary) = manager.tick_at(t0 + Duration::from_millis(50 * u64::from(i))) {
            return Some((i, summary));
        }
    }
    None
}

// ── Full runs ───────────────────────────────────────────────────────

#[test]
fn five_chunks_with_two_in_flight_finish_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(2, 10));

    manager.start(world, Area::rect(0, 0, 4, 0), None).unwrap();
    let (ticks, summary) = tick_until_done(&mut manager, 20).expect("job should finish");

    assert_eq!(summary.done, 5);
    assert_eq!(summary.total, 5);
    assert_eq!(summary.errors, 0);
    assert!(ticks <= 5, "took {ticks} ticks");
    assert!(!manager.is_running());
    assert!(!manager.store().exists());
    assert_eq!(manager.host().requested.len(), 5);
}

#[test]
fn single_chunk_circle_requests_its_center() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(2, 10));

    manager.start(world, Area::circle(5, 5, 0), None).unwrap();
    tick_until_done(&mut manager, 10).expect("job should finish");
    assert_eq!(manager.host().requested, vec![ChunkKey::pack(5, 5)]);
}

#[test]
fn rect_is_requested_in_region_major_order() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(8, 8));

    manager.start(world, Area::rect(0, 0, 1, 1), None).unwrap();
    tick_until_done(&mut manager, 10).expect("job should finish");
    assert_eq!(
        manager.host().requested,
        vec![
            ChunkKey::pack(0, 0),
            ChunkKey::pack(1, 0),
            ChunkKey::pack(0, 1),
            ChunkKey::pack(1, 1),
        ]
    );
}

#[test]
fn every_chunk_is_requested_once() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(16, 7));
    let area = Area::circle(-20, 40, 25);

    manager.start(world, area, None).unwrap();
    let (_, summary) = tick_until_done(&mut manager, 10_000).expect("job should finish");

    let mut requested = manager.host().requested.clone();
    requested.sort();
    requested.dedup();
    assert_eq!(requested.len() as u64, area.total_chunks());
    assert_eq!(summary.done, area.total_chunks());
    assert!(requested.iter().all(|k| area.contains(k.x(), k.z())));
}

// ── Lifecycle errors ────────────────────────────────────────────────

#[test]
fn only_one_job_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(2, 2));

    manager.start(world, Area::rect(0, 0, 9, 9), None).unwrap();
    let err = manager.start(world, Area::rect(0, 0, 1, 1), None).unwrap_err();
    assert!(matches!(err, SchedulerError::JobAlreadyRunning));
}

#[test]
fn operations_without_job_fail() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, _) = manager(dir.path(), settings(2, 2));

    assert!(matches!(manager.pause(), Err(SchedulerError::JobNotRunning)));
    assert!(matches!(manager.resume(), Err(SchedulerError::JobNotRunning)));
    assert!(matches!(manager.stop(), Err(SchedulerError::JobNotRunning)));
    assert!(matches!(manager.status(), Err(SchedulerError::JobNotRunning)));
    assert!(manager.tick().is_none());
    assert!(manager.shutdown().is_none());
}

#[test]
fn unknown_world_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, _) = manager(dir.path(), settings(2, 2));
    let other = Uuid::new_v4();

    let err = manager.start(other, Area::rect(0, 0, 1, 1), None).unwrap_err();
    assert!(matches!(err, SchedulerError::WorldNotFound(id) if id == other));
    assert!(!manager.is_running());
}

#[test]
fn status_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(4, 4));

    manager.start(world, Area::rect(0, 0, 9, 9), None).unwrap();
    manager.tick();
    manager.tick();
    let status = manager.status().unwrap();
    assert_eq!(status.world, world);
    assert_eq!(status.shape, "rect");
    assert_eq!(status.total, 100);
    assert_eq!(status.done, 4);
    assert_eq!(status.percent, 4.0);
    assert!(!status.is_paused());
}

#[test]
fn pause_holds_progress() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(4, 4));

    manager.start(world, Area::rect(0, 0, 9, 9), None).unwrap();
    manager.pause().unwrap();
    for _ in 0..5 {
        manager.tick();
    }
    assert!(manager.host().requested.is_empty());
    assert!(manager.status().unwrap().manual_paused);

    manager.resume().unwrap();
    manager.tick();
    assert_eq!(manager.host().requested.len(), 4);
}

// ── Persistence ─────────────────────────────────────────────────────

#[test]
fn stop_discards_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(4, 4));

    manager.start(world, Area::rect(0, 0, 9, 9), Some("operator".into())).unwrap();
    assert!(manager.store().exists());
    manager.tick();
    let summary = manager.stop().unwrap();
    assert_eq!(summary.total, 100);
    assert!(!manager.store().exists());
    assert!(!manager.try_auto_resume());
}

#[test]
fn shutdown_then_auto_resume_completes_the_area() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(4, 4));

    manager
        .start(world, Area::rect(0, 0, 9, 9), Some("operator".into()))
        .unwrap();
    for _ in 0..5 {
        manager.tick();
    }
    manager.pause().unwrap();
    manager.tick();
    let before = manager.shutdown().unwrap();
    assert!(before.done > 0 && before.done < 100);

    let snapshot = manager.store().load().unwrap().unwrap();
    assert_eq!(snapshot.starter_id.as_deref(), Some("operator"));
    assert_eq!(snapshot.done, before.done);

    // Fresh process over the same store and world.
    let store = JobStore::open(dir.path()).unwrap();
    let mut restarted = JobManager::new(InstantHost::new(world), settings(4, 4), store);
    assert!(restarted.on_startup());
    let (_, summary) = tick_until_done(&mut restarted, 1000).expect("resumed job should finish");

    assert_eq!(summary.done, 100);
    assert_eq!(restarted.host().requested.len() as u64, 100 - before.done);
    assert!(!restarted.store().exists());
}

#[test]
fn auto_resume_disabled_leaves_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(4, 4));
    manager.start(world, Area::rect(0, 0, 9, 9), None).unwrap();
    manager.shutdown();

    let mut s = settings(4, 4);
    s.auto_resume_on_start = false;
    let store = JobStore::open(dir.path()).unwrap();
    let mut restarted = JobManager::new(InstantHost::new(world), s, store);
    assert!(!restarted.on_startup());
    assert!(restarted.store().exists());
}

#[test]
fn snapshot_for_missing_world_is_not_resumed() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(4, 4));
    manager.start(world, Area::rect(0, 0, 9, 9), None).unwrap();
    manager.shutdown();

    let store = JobStore::open(dir.path()).unwrap();
    let mut elsewhere = JobManager::new(InstantHost::new(Uuid::new_v4()), settings(4, 4), store);
    assert!(!elsewhere.try_auto_resume());
    assert!(!elsewhere.is_running());
}

#[test]
fn corrupt_snapshot_is_not_resumed() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, _) = manager(dir.path(), settings(4, 4));
    let corrupt = br#"{"worldId":"nope","area":{"type":"blob"}}"#;
    std::fs::write(manager.store().path(), corrupt).unwrap();

    assert!(!manager.try_auto_resume());
    assert!(!manager.is_running());
}

// ── Reload ──────────────────────────────────────────────────────────

#[test]
fn reload_applies_to_running_job() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(2, 2));

    manager.start(world, Area::rect(0, 0, 9, 9), None).unwrap();
    manager.tick();
    assert_eq!(manager.host().requested.len(), 2);

    manager.reload(settings(10, 10));
    assert_eq!(manager.settings().limits.max_concurrent, 10);
    manager.tick();
    assert_eq!(manager.host().requested.len(), 12);
}

// ── Async driver ────────────────────────────────────────────────────

#[tokio::test]
async fn run_loop_ticks_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(2, 2));
    manager.start(world, Area::rect(0, 0, 99, 99), None).unwrap();

    let (_control_tx, control_rx) = mpsc::unbounded_channel();
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let exit = manager.run(Duration::from_millis(1), control_rx, rx).await;
        (manager, exit)
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();
    let (manager, exit) = handle.await.unwrap();

    let RunExit::Shutdown(Some(summary)) = exit else {
        panic!("expected a persisted shutdown, got {exit:?}");
    };
    assert!(!manager.is_running());
    assert!(manager.host().host_ticks > 0);
    assert!(!manager.host().requested.is_empty());
    let snapshot = manager.store().load().unwrap().expect("shutdown keeps the snapshot");
    assert_eq!(snapshot.done, summary.done);
}

#[tokio::test]
async fn run_loop_returns_when_the_job_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(4, 4));
    manager.start(world, Area::rect(0, 0, 4, 4), None).unwrap();

    let (_control_tx, control_rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let exit = tokio::time::timeout(
        Duration::from_secs(5),
        manager.run(Duration::from_millis(1), control_rx, shutdown_rx),
    )
    .await
    .expect("run should return once the area is done");

    let RunExit::Finished(summary) = exit else {
        panic!("expected finished, got {exit:?}");
    };
    assert_eq!(summary.done, 25);
    assert!(!manager.store().exists());
}

#[tokio::test]
async fn run_loop_applies_controls() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, world) = manager(dir.path(), settings(2, 2));
    manager.start(world, Area::rect(0, 0, 99, 99), None).unwrap();

    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let driver = async {
        control_tx.send(Control::Pause).unwrap();
        control_tx.send(Control::Reload(settings(8, 8))).unwrap();
        let (reply_tx, reply_rx) = oneshot::channel();
        control_tx.send(Control::Status(reply_tx)).unwrap();
        let status = reply_rx.await.unwrap().unwrap();
        control_tx.send(Control::Stop).unwrap();
        status
    };

    let run = manager.run(Duration::from_millis(1), control_rx, shutdown_rx);
    let (exit, status) = tokio::join!(run, driver);

    assert!(status.manual_paused);
    let RunExit::Stopped(summary) = exit else {
        panic!("expected stopped, got {exit:?}");
    };
    assert_eq!(summary.total, 10_000);
    assert_eq!(manager.settings().limits.max_concurrent, 8);
    assert!(!manager.is_running());
    assert!(!manager.store().exists());
}
