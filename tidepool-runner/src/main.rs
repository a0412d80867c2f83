//! tidepool scene runner
//!
//! Usage: `tidepool-runner [scene.json] [--ticks N] [--dt SECS] [--seed N]`
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` for more detail.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use tidepool_runner::{run_scene, SceneConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Run a tidepool scene headless", long_about = None)]
struct Args {
    /// Scene file (JSON). Defaults are used when omitted.
    config: Option<PathBuf>,

    /// Frames to simulate, overriding the scene.
    #[arg(long)]
    ticks: Option<u64>,

    /// Seconds per frame, overriding the scene.
    #[arg(long)]
    dt: Option<f32>,

    /// Seed for spawning and splashes, overriding the scene.
    #[arg(long)]
    seed: Option<u64>,

    /// Swarm parameter override, e.g. `--set max_speed=0.4`. Repeatable.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    overrides: Vec<String>,

    /// Write the default scene to this path and exit.
    #[arg(long, value_name = "PATH")]
    write_default: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(path) = &args.write_default {
        SceneConfig::default().save(path)?;
        info!("wrote default scene to {}", path.display());
        return Ok(());
    }

    let mut scene = match &args.config {
        Some(path) => SceneConfig::load(path)?,
        None => {
            warn!("no scene file given, using defaults");
            SceneConfig::default()
        }
    };

    if let Some(ticks) = args.ticks {
        scene.run.ticks = ticks;
    }
    if let Some(dt) = args.dt {
        scene.run.dt = dt;
    }
    if let Some(seed) = args.seed {
        scene.seed = Some(seed);
    }
    for assignment in &args.overrides {
        scene
            .apply_override(assignment)
            .with_context(|| format!("invalid --set {assignment}"))?;
    }
    scene.validate().context("scene failed validation")?;

    info!(
        "scene '{}': {}x{} waves, {} boids, seed {:?}",
        scene.name, scene.wave.rows, scene.wave.cols, scene.run.boid_count, scene.seed
    );
    let summary = run_scene(&scene).context("simulation failed")?;
    info!("{summary}");
    Ok(())
}
