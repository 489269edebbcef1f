//! pregen — adaptive chunk pre-generation from the command line.
//!
//! Runs generation jobs against an in-process simulated host, persists
//! them for later resumption, and inspects the persisted snapshot.
//!
//! # Usage
//!
//! ```text
//! pregen init-config
//! pregen run --shape circle --radius 200
//! pregen status
//! pregen resume
//! ```
//!
//! While a job runs, `pause`, `resume`, `stop`, `status`, and `reload`
//! can be typed on stdin.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pregen_core::{Area, WorldBorder};
use uuid::Uuid;

mod commands;
mod format;
mod sim;

use commands::job::RunOptions;
use sim::SimConfig;

#[derive(Parser)]
#[command(
    name = "pregen",
    about = "Adaptive, resumable chunk pre-generation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (missing file means defaults).
    #[arg(long, global = true, default_value = "pregen.toml")]
    config: PathBuf,

    /// Directory holding the job snapshot.
    #[arg(long, global = true, default_value = "pregen-data")]
    data_dir: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a new job and drive it until it finishes.
    Run {
        #[command(flatten)]
        area: AreaArgs,

        /// World to generate in (random if omitted).
        #[arg(long)]
        world: Option<Uuid>,

        /// Who started the job, recorded in the snapshot.
        #[arg(long)]
        starter: Option<String>,

        #[command(flatten)]
        sim: SimArgs,
    },
    /// Continue the persisted job.
    Resume {
        #[command(flatten)]
        sim: SimArgs,
    },
    /// Show the persisted job snapshot.
    Status {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Delete the persisted job snapshot.
    Clear,
    /// Write a config file with every option at its default.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShapeArg {
    Circle,
    Square,
    Rect,
    Worldborder,
}

#[derive(Args)]
struct AreaArgs {
    #[arg(long, value_enum, default_value = "circle")]
    shape: ShapeArg,

    /// Center chunk X (circle, square).
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    center_x: i32,

    /// Center chunk Z (circle, square).
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    center_z: i32,

    /// Radius in chunks (circle, square).
    #[arg(long, default_value = "32")]
    radius: i32,

    /// Corner chunk coordinates (rect).
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    min_x: i32,
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    min_z: i32,
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    max_x: i32,
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    max_z: i32,

    /// World border center in blocks (worldborder).
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    border_center_x: f64,
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    border_center_z: f64,

    /// World border side length in blocks (worldborder).
    #[arg(long, default_value = "1024")]
    border_size: f64,
}

impl AreaArgs {
    fn area(&self) -> Area {
        match self.shape {
            ShapeArg::Circle => Area::circle(self.center_x, self.center_z, self.radius),
            ShapeArg::Square => Area::square(self.center_x, self.center_z, self.radius),
            ShapeArg::Rect => Area::rect(self.min_x, self.min_z, self.max_x, self.max_z),
            ShapeArg::Worldborder => Area::world_border(&WorldBorder {
                center_x: self.border_center_x,
                center_z: self.border_center_z,
                size: self.border_size,
            }),
        }
    }
}

#[derive(Args)]
struct SimArgs {
    /// Milliseconds between host ticks.
    #[arg(long, default_value = "50")]
    tick_ms: u64,

    /// Host ticks between a request and its completion.
    #[arg(long, default_value = "2")]
    latency_ticks: u64,

    /// Simulated tick time with no load.
    #[arg(long, default_value = "5.0")]
    base_tick_ms: f64,

    /// Simulated tick time added per completed chunk.
    #[arg(long, default_value = "0.05")]
    cost_per_chunk_ms: f64,

    /// Fail every n-th request (0 never fails).
    #[arg(long, default_value = "0")]
    fail_every: u64,

    /// Region directory consulted when skip mode is enabled.
    #[arg(long)]
    region_dir: Option<PathBuf>,
}

impl SimArgs {
    fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    fn config(&self) -> SimConfig {
        SimConfig {
            latency_ticks: self.latency_ticks,
            base_tick_ms: self.base_tick_ms,
            cost_per_chunk_ms: self.cost_per_chunk_ms,
            fail_every: self.fail_every,
            region_dir: self.region_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,pregen=debug"))?;
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Command::Run {
            area,
            world,
            starter,
            sim,
        } => {
            let settings = commands::config::load_settings(&cli.config)?;
            let opts = RunOptions {
                world,
                config: cli.config.clone(),
                starter,
                tick: sim.tick(),
                sim: sim.config(),
            };
            commands::job::run(settings, &cli.data_dir, area.area(), opts).await
        }
        Command::Resume { sim } => {
            let settings = commands::config::load_settings(&cli.config)?;
            let (tick, sim) = (sim.tick(), sim.config());
            commands::job::resume(settings, &cli.data_dir, &cli.config, tick, sim).await
        }
        Command::Status { format } => commands::job::status(&cli.data_dir, format == "json"),
        Command::Clear => commands::job::clear(&cli.data_dir),
        Command::InitConfig { force } => commands::config::init(&cli.config, force),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn rect_arguments_build_a_rect() {
        let cli = Cli::parse_from([
            "pregen", "run", "--shape", "rect", "--min-x", "-3", "--min-z", "0", "--max-x", "4",
            "--max-z", "1",
        ]);
        let Command::Run { area, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(area.area(), Area::rect(-3, 0, 4, 1));
    }

    #[test]
    fn global_paths_follow_subcommand() {
        let cli = Cli::parse_from(["pregen", "status", "--data-dir", "/tmp/x", "--format", "json"]);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/x"));
        assert!(matches!(cli.command, Command::Status { ref format } if format == "json"));
    }
}
