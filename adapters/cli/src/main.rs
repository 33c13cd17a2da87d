#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line runner for Rockfall sessions.

mod config;
mod run;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;

/// Simulates a Rockfall session without a window and prints a summary.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file overriding the built-in tuning.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wall seconds to simulate.
    #[arg(long, default_value_t = 150.0)]
    seconds: f32,

    /// Fixed frame delta in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Seconds between scripted target hits; 0 disables hits.
    #[arg(long, default_value_t = 4.0)]
    hit_every: f32,

    /// Session seconds to skip before the run starts.
    #[arg(long, default_value_t = 0.0)]
    fast_forward: f32,

    /// Session second at which the player dies.
    #[arg(long)]
    die_at: Option<f32>,

    /// Overrides the hazard and target placement seeds.
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn non_negative_secs(flag: &str, value: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(value)
        .with_context(|| format!("--{flag} must be a non-negative number of seconds, got {value}"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .parse_default_env()
        .try_init()
        .context("failed to install logger")?;

    if args.frame_ms == 0 {
        bail!("--frame-ms must be at least 1");
    }

    let mut tuning = config::load_tuning(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        tuning.spawning.rng_seed = seed;
        tuning.targets.rng_seed = seed;
    }

    let hit_every = non_negative_secs("hit-every", args.hit_every)?;
    let plan = run::RunPlan {
        duration: non_negative_secs("seconds", args.seconds)?,
        frame: Duration::from_millis(args.frame_ms),
        hit_every: (!hit_every.is_zero()).then_some(hit_every),
        fast_forward: non_negative_secs("fast-forward", args.fast_forward)?,
        die_at: args.die_at,
    };

    log::info!(target: "cli", "simulating {:?} in {:?} frames", plan.duration, plan.frame);
    let summary = run::run(&tuning, plan)?;
    println!("{summary}");
    Ok(())
}
