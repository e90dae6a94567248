#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a bike swarm headlessly on virtual time.

mod run;
mod scenario;

use std::{env, path::PathBuf, time::Duration};

use anyhow::{ensure, Result};
use bike_swarm_core::Bounds;
use clap::Parser;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::{
    run::{run, RunOptions},
    scenario::Scenario,
};

#[derive(Debug, Parser)]
#[command(name = "bike-swarm")]
#[command(about = "Run a bike swarm on a virtual clock and report its population")]
struct Args {
    /// Scenario TOML holding the swarm configuration and scripted actions.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Seed for the swarm's random number generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Container width in pixels.
    #[arg(long, default_value_t = 800.0)]
    width: f32,
    /// Container height in pixels.
    #[arg(long, default_value_t = 600.0)]
    height: f32,
    /// Virtual time to run for, in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    duration_ms: u64,
    /// Emulated display refresh rate.
    #[arg(long, default_value_t = 60)]
    refresh_hz: u32,
    /// Interval between population reports, in milliseconds. Zero disables them.
    #[arg(long, default_value_t = 1_000)]
    report_every_ms: u64,
    /// Switch the swarm to fall mode regardless of the scenario.
    #[arg(long)]
    fall: bool,
    /// Print an ASCII snapshot of the scene taken just before stopping.
    #[arg(long)]
    ascii: bool,
}

/// Builds the log filter from `RUST_LOG`-style directives, logging at `info`
/// when none are given.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives.unwrap_or_default())
}

/// Entry point for the bike swarm command-line interface.
fn main() -> Result<()> {
    let directives = env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();

    let args = Args::parse();
    ensure!(
        args.width > 0.0 && args.height > 0.0,
        "container must have a positive size, got {}x{}",
        args.width,
        args.height
    );

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    let (mut config, timeline) = scenario.into_timeline();
    if args.fall {
        config.fall_enabled = true;
    }

    let options = RunOptions {
        bounds: Bounds::new(args.width, args.height),
        seed: args.seed,
        duration: Duration::from_millis(args.duration_ms),
        refresh_hz: args.refresh_hz,
        report_every: Duration::from_millis(args.report_every_ms),
        ascii: args.ascii,
    };
    tracing::info!(
        seed = options.seed,
        duration_ms = args.duration_ms,
        actions = timeline.len(),
        fall = config.fall_enabled,
        "starting swarm"
    );

    let summary = run(config, timeline, &options);
    println!("{summary}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(Some("")).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn log_filter_honours_a_global_level() {
        assert_eq!(
            log_filter(Some("debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            log_filter(Some("warn")).max_level_hint(),
            Some(LevelFilter::WARN)
        );
    }

    #[test]
    fn log_filter_keeps_target_directives() {
        let filter = log_filter(Some("bike_swarm_system_swarm=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }
}
