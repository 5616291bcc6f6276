//! Terminal front end for the culture simulation.

mod render;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use culture_core::{Expansion, HabitatConfig, SimulationConfig};
use culture_world::{ManualClock, NullSink, Simulation, SimulationResult, SystemClock, Unpaced};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "culture-term",
    version,
    about = "Competing organisms growing and fighting on a shared grid"
)]
struct Cli {
    /// JSON configuration file; flags below override its values.
    #[arg(short, long, env = "CULTURE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of organisms seeded at start.
    #[arg(short = 'n', long)]
    organisms: Option<usize>,

    /// Grid width in cells (default: terminal width minus one).
    #[arg(long)]
    width: Option<usize>,

    /// Grid height in cells (default: terminal height minus one).
    #[arg(long)]
    height: Option<usize>,

    /// Random seed; a fresh one is drawn when neither this nor a config file sets it.
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many ticks.
    #[arg(long)]
    ticks: Option<u64>,

    /// Restrict growth to a disc of this radius centred on the grid.
    #[arg(long)]
    habitat_radius: Option<f64>,

    /// Track per-cell life and let cells decay over time.
    #[arg(long)]
    life: bool,

    /// Use the per-boundary-cell expansion rule instead of the ring rule.
    #[arg(long)]
    frontier: bool,

    /// Delay between frames in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Run without drawing and print the result as JSON.
    #[arg(long)]
    headless: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_telemetry(cli.headless, cli.log_json)?;

    let config = build_config(&cli)?;
    info!(
        width = config.world.width,
        height = config.world.height,
        organisms = config.spawn.organisms,
        seed = config.seed,
        "Starting culture"
    );

    let result = if cli.headless {
        run_headless(config)?
    } else {
        run_terminal(config)?
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn build_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let mut config = SimulationConfig::default();
            config.seed = rand::random();
            if !cli.headless {
                let (width, height) =
                    render::terminal_grid_size().context("failed to read terminal size")?;
                config.world.width = width;
                config.world.height = height;
            }
            config
        }
    };

    if let Some(organisms) = cli.organisms {
        config.spawn.organisms = organisms;
    }
    if let Some(width) = cli.width {
        config.world.width = width;
    }
    if let Some(height) = cli.height {
        config.world.height = height;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(ticks) = cli.ticks {
        config.num_ticks = Some(ticks);
    }
    if let Some(radius) = cli.habitat_radius {
        config.world.habitat = Some(HabitatConfig { radius });
    }
    if let Some(interval) = cli.interval_ms {
        config.frame_interval_ms = interval;
    }
    if cli.life {
        config.rules.track_life = true;
    }
    if cli.frontier {
        config.rules.expansion = Expansion::Frontier;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Headless runs use a manual clock advancing one frame interval per tick,
/// so a seed fully determines the outcome.
fn run_headless(config: SimulationConfig) -> Result<SimulationResult> {
    let clock = ManualClock::new(Duration::from_millis(config.frame_interval_ms));
    let mut sim = Simulation::new(config, clock).context("failed to seed culture")?;
    let result = sim.run(&mut NullSink, &mut Unpaced)?;
    Ok(result)
}

fn run_terminal(config: SimulationConfig) -> Result<SimulationResult> {
    let interval = Duration::from_millis(config.frame_interval_ms);
    let mut sim =
        Simulation::new(config, SystemClock::new()).context("failed to seed culture")?;

    let guard = render::TerminalGuard::enter().context("failed to prepare terminal")?;
    let mut sink = render::TerminalSink::new();
    let mut pacer = render::KeyPacer::new(interval);
    let result = sim.run(&mut sink, &mut pacer);
    drop(guard);

    Ok(result?)
}
