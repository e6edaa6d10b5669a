use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use deep_history::flush::{load_snapshot, save_snapshot};
use deep_history::{ContentRegistry, SimConfig, Simulation, WorldGenConfig};

#[derive(Parser, Debug)]
#[command(name = "deep-history")]
#[command(about = "Simulate the spread of human groups and tribes over a generated planet")]
struct Args {
    /// World seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Cells around the planet
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Cells from pole to pole
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Years to simulate from the start (or from the resumed snapshot)
    #[arg(short, long)]
    years: Option<i64>,

    /// Population of the founding group
    #[arg(short, long)]
    population: Option<u64>,

    /// TOML file with `[worldgen]` and `[sim]` tables; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TOML file of `[[knowledge_boost]]` event generators
    #[arg(long)]
    content: Option<PathBuf>,

    /// Save snapshots under this directory
    #[arg(long)]
    save: Option<PathBuf>,

    /// Save a snapshot every N years (requires --save)
    #[arg(long)]
    snapshot_interval: Option<i64>,

    /// Resume from a snapshot directory instead of generating a world
    #[arg(long)]
    resume: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    worldgen: WorldGenConfig,
    sim: SimConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut file = match &args.config {
        Some(path) => toml::from_str::<FileConfig>(&fs::read_to_string(path)?)?,
        None => FileConfig::default(),
    };
    if let Some(seed) = args.seed {
        file.worldgen.seed = seed;
    }
    if let Some(width) = args.width {
        file.worldgen.width = width;
    }
    if let Some(height) = args.height {
        file.worldgen.height = height;
    }
    if let Some(population) = args.population {
        file.sim.initial_population = population;
    }
    if let Some(dir) = &args.save {
        file.sim.output_dir = Some(dir.clone());
    }
    if let Some(interval) = args.snapshot_interval {
        file.sim.snapshot_interval = Some(interval);
    }

    let content = match &args.content {
        Some(path) => ContentRegistry::from_toml_str(&fs::read_to_string(path)?)?,
        None => ContentRegistry::new(),
    };
    info!(generators = content.len(), "content loaded");

    let mut sim = match &args.resume {
        Some(dir) => {
            let world = load_snapshot(dir, &content)?;
            Simulation::new(world, content)
        }
        None => Simulation::generate(&file.worldgen, &file.sim, content)?,
    };
    if let Some(years) = args.years {
        file.sim.end_date = sim.world.current_date.saturating_add(years);
    }

    sim.run(&file.sim)?;
    if let (Some(dir), None) = (&file.sim.output_dir, file.sim.snapshot_interval) {
        let final_dir = dir.join("final");
        save_snapshot(&sim.world, &final_dir)?;
        info!(dir = %final_dir.display(), "snapshot saved");
    }
    Ok(())
}
