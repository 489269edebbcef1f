use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pregen_core::{Area, Settings};
use pregen_scheduler::{Control, JobManager, JobStatus, RunExit};
use pregen_state::{epoch_millis, JobStore, WorldId};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::format;
use crate::sim::{SimConfig, SimulatedHost};

/// How often the CLI prints a status line while driving a job.
const STATUS_EVERY: Duration = Duration::from_secs(5);

pub struct RunOptions {
    pub world: Option<WorldId>,
    /// Config file re-read by the `reload` console command.
    pub config: PathBuf,
    pub starter: Option<String>,
    pub tick: Duration,
    pub sim: SimConfig,
}

/// Start a new job against the simulated host and drive it to the end.
pub async fn run(
    settings: Settings,
    data_dir: &Path,
    area: Area,
    opts: RunOptions,
) -> anyhow::Result<()> {
    let store = JobStore::open(data_dir)?;
    if store.exists() {
        anyhow::bail!(
            "a job snapshot already exists at {} (use `pregen resume` or `pregen clear`)",
            store.path().display()
        );
    }

    let world = opts.world.unwrap_or_else(Uuid::new_v4);
    let host = SimulatedHost::new(world, opts.sim);
    let mut manager = JobManager::new(host, settings, store);
    manager.start(world, area, opts.starter)?;
    println!("Generating {} chunks of {} in world {world}", area.total_chunks(), area.name());
    drive(&mut manager, &opts.config, opts.tick, stdin_lines()).await
}

/// Continue the persisted job.
pub async fn resume(
    settings: Settings,
    data_dir: &Path,
    config: &Path,
    tick: Duration,
    sim: SimConfig,
) -> anyhow::Result<()> {
    let store = JobStore::open(data_dir)?;
    let Some(state) = store.load()? else {
        anyhow::bail!("nothing to resume in {}", data_dir.display());
    };

    let host = SimulatedHost::new(state.world_id, sim);
    let mut manager = JobManager::new(host, settings, store);
    if !manager.try_auto_resume() {
        anyhow::bail!("snapshot in {} could not be resumed", data_dir.display());
    }
    println!("Resuming {} at {} chunks done", state.area.name(), state.done);
    drive(&mut manager, config, tick, stdin_lines()).await
}

/// Print the persisted snapshot.
pub fn status(data_dir: &Path, json: bool) -> anyhow::Result<()> {
    let store = JobStore::open(data_dir)?;
    let Some(state) = store.load()? else {
        println!("No job in {}", data_dir.display());
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        let age = Duration::from_millis(epoch_millis().saturating_sub(state.started_at_ms));
        println!("{}", format::snapshot(&state, state.area.total_chunks(), age));
    }
    Ok(())
}

/// Delete the persisted snapshot.
pub fn clear(data_dir: &Path) -> anyhow::Result<()> {
    let store = JobStore::open(data_dir)?;
    if store.clear()? {
        println!("✓ Cleared {}", store.path().display());
    } else {
        println!("No job in {}", data_dir.display());
    }
    Ok(())
}

/// Operator commands read from stdin while a job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Console {
    Pause,
    Resume,
    Stop,
    Status,
    Reload,
    Unknown(String),
}

impl Console {
    fn parse(line: &str) -> Option<Self> {
        let word = line.trim().to_ascii_lowercase();
        Some(match word.as_str() {
            "" => return None,
            "pause" => Console::Pause,
            "resume" => Console::Resume,
            "stop" => Console::Stop,
            "status" => Console::Status,
            "reload" => Console::Reload,
            _ => Console::Unknown(word),
        })
    }
}

/// Forward stdin lines from a detached thread.
///
/// The thread blocks in `read_line` and never holds up process exit.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run the manager until its job finishes, is stopped, or Ctrl-C is pressed.
///
/// Ctrl-C keeps the snapshot so the job can be resumed later; `stop`
/// discards it.
async fn drive(
    manager: &mut JobManager<SimulatedHost>,
    config: &Path,
    tick: Duration,
    lines: mpsc::UnboundedReceiver<String>,
) -> anyhow::Result<()> {
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let exit = tokio::select! {
        exit = manager.run(tick, control_rx, shutdown_rx) => exit,
        res = operator_console(lines, control_tx, shutdown_tx, config) => {
            res?;
            anyhow::bail!("operator console ended before the job");
        }
    };

    match exit {
        RunExit::Finished(summary) => {
            let host = manager.host();
            println!("✓ Finished {}", format::summary(&summary));
            println!("  host generated {}, released {}", host.generated(), host.unloaded());
        }
        RunExit::Stopped(summary) => println!("Stopped {}", format::summary(&summary)),
        RunExit::Shutdown(Some(summary)) => {
            println!("Saved {} (resume with `pregen resume`)", format::summary(&summary));
        }
        RunExit::Shutdown(None) => {}
    }
    Ok(())
}

/// Turn operator input, periodic reports, and Ctrl-C into [`Control`]s.
///
/// Only returns on error; the run loop ends the job.
async fn operator_console(
    mut lines: mpsc::UnboundedReceiver<String>,
    control: mpsc::UnboundedSender<Control>,
    shutdown: watch::Sender<bool>,
    config: &Path,
) -> anyhow::Result<()> {
    let mut report = tokio::time::interval(STATUS_EVERY);
    report.tick().await;
    let mut lines_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = report.tick() => {
                if let Some(Ok(status)) = request_status(&control).await {
                    println!("{}", format::status(&status));
                }
            }
            line = lines.recv(), if lines_open => {
                let Some(line) = line else {
                    lines_open = false;
                    continue;
                };
                match Console::parse(&line) {
                    None => {}
                    Some(Console::Pause) => {
                        control.send(Control::Pause)?;
                        println!("Pausing");
                    }
                    Some(Console::Resume) => {
                        control.send(Control::Resume)?;
                        println!("Resuming");
                    }
                    Some(Console::Stop) => control.send(Control::Stop)?,
                    Some(Console::Status) => match request_status(&control).await {
                        Some(Ok(status)) => println!("{}", format::status(&status)),
                        Some(Err(e)) => println!("{e}"),
                        None => {}
                    },
                    Some(Console::Reload) => match super::config::load_settings(config) {
                        Ok(settings) => {
                            control.send(Control::Reload(settings))?;
                            println!("Reloaded {}", config.display());
                        }
                        Err(e) => warn!(error = %e, "reload failed, keeping current settings"),
                    },
                    Some(Console::Unknown(word)) => {
                        println!("unknown command {word:?} (pause, resume, stop, status, reload)");
                    }
                }
            }
            res = &mut ctrl_c, if !interrupted => {
                res?;
                info!("interrupted");
                interrupted = true;
                shutdown.send(true)?;
            }
        }
    }
}

/// Ask the run loop for a status snapshot; `None` once it has stopped.
async fn request_status(
    control: &mpsc::UnboundedSender<Control>,
) -> Option<pregen_scheduler::SchedulerResult<JobStatus>> {
    let (tx, rx) = oneshot::channel();
    control.send(Control::Status(tx)).ok()?;
    rx.await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_words() {
        assert_eq!(Console::parse("  Pause \n"), Some(Console::Pause));
        assert_eq!(Console::parse("stop"), Some(Console::Stop));
        assert_eq!(Console::parse("RELOAD"), Some(Console::Reload));
        assert_eq!(Console::parse(""), None);
        assert_eq!(Console::parse("jump"), Some(Console::Unknown("jump".into())));
    }

    #[test]
    fn status_without_snapshot_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        status(dir.path(), false).unwrap();
        clear(dir.path()).unwrap();
    }

    fn started(dir: &Path, area: Area) -> JobManager<SimulatedHost> {
        let store = JobStore::open(dir).unwrap();
        let world = Uuid::new_v4();
        let host = SimulatedHost::new(world, SimConfig::default());
        let mut manager = JobManager::new(host, Settings::default(), store);
        manager.start(world, area, None).unwrap();
        manager
    }

    fn one_ms() -> Duration {
        Duration::from_millis(1)
    }

    #[tokio::test]
    async fn run_refuses_to_overwrite_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        started(dir.path(), Area::rect(0, 0, 9, 9)).shutdown();

        let opts = RunOptions {
            world: None,
            starter: None,
            tick: one_ms(),
            sim: SimConfig::default(),
            config: dir.path().join("pregen.toml"),
        };
        let err = run(Settings::default(), dir.path(), Area::rect(0, 0, 1, 1), opts)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn drive_returns_while_input_stays_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = started(dir.path(), Area::square(0, 0, 3));
        // Sender kept alive: the console never sees end of input.
        let (_lines_tx, lines_rx) = mpsc::unbounded_channel();

        tokio::time::timeout(
            Duration::from_secs(10),
            drive(&mut manager, &dir.path().join("pregen.toml"), one_ms(), lines_rx),
        )
        .await
        .expect("drive should return once the job finishes")
        .unwrap();

        assert!(!manager.is_running());
        assert_eq!(manager.host().generated(), 49);
        assert!(!manager.store().exists());
    }

    #[tokio::test]
    async fn stop_typed_on_console_ends_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = started(dir.path(), Area::rect(0, 0, 999, 999));
        let (lines_tx, lines_rx) = mpsc::unbounded_channel();
        lines_tx.send("pause".to_string()).unwrap();
        lines_tx.send("status".to_string()).unwrap();
        lines_tx.send("stop".to_string()).unwrap();

        tokio::time::timeout(
            Duration::from_secs(10),
            drive(&mut manager, &dir.path().join("pregen.toml"), one_ms(), lines_rx),
        )
        .await
        .expect("stop should end drive")
        .unwrap();

        assert!(!manager.is_running());
        assert!(!manager.store().exists());
    }

    #[tokio::test]
    async fn resume_without_snapshot_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("pregen.toml");
        let err = resume(Settings::default(), dir.path(), &config, one_ms(), SimConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nothing to resume"));
    }
}
