//! orbit CLI - run a Lua script against an event loop.
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. Environment variables (`ORBIT_*`)
//! 2. `--config PATH`
//! 3. Project config (`orbit.toml` in the project root)
//! 4. Default values (lowest priority)
//!
//! # Lifetime
//!
//! The script runs to completion inside the dispatcher. The loop then
//! keeps running so timers and queued events can fire, until either no
//! timer is pending or `--run-for-ms` elapses, whichever comes first.

use anyhow::{Context, Result};
use clap::Parser;
use orbit_runtime::config::{ConfigLoader, OrbitConfig};
use orbit_runtime::EventLoop;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Polling interval while waiting for timers.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// orbit - event loop runner for Lua scripts
#[derive(Parser, Debug)]
#[command(name = "orbit")]
#[command(version, about, long_about = None)]
struct Args {
    /// Lua script to run
    script: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Config file (layered over <project>/orbit.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Project root directory (defaults to current directory)
    #[arg(short = 'C', long)]
    project: Option<PathBuf>,

    /// Upper bound on how long the loop keeps running after the script returns
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    run_for_ms: u64,

    /// Keep running for the full --run-for-ms even when no timer is pending
    #[arg(long)]
    no_idle_exit: bool,

    /// Register a simple event before the script runs (repeatable)
    #[arg(short, long = "event", value_name = "NAME")]
    events: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Filter: RUST_LOG env > --debug > default "warn"
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.debug { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    debug!(?config, "Resolved configuration");

    let host = orbit_lua::init(mlua::Lua::new(), &config).context("failed to start event loop")?;

    for name in &args.events {
        host.event_loop()
            .register_event(name.as_str(), true)
            .with_context(|| format!("failed to register event '{name}'"))?;
    }

    info!(script = %args.script.display(), "Running script");
    host.exec_file(&args.script)
        .with_context(|| format!("script failed: {}", args.script.display()))?;

    let budget = Duration::from_millis(args.run_for_ms);
    let waited = wait_for_idle(host.event_loop(), budget, !args.no_idle_exit);

    let stats = host.event_loop().stats();
    info!(
        waited_ms = waited.as_millis() as u64,
        emissions = stats.emissions,
        invocations = stats.invocations,
        failures = stats.failures,
        dropped = stats.dropped,
        "Loop finished"
    );
    host.shutdown();
    Ok(())
}

fn load_config(args: &Args) -> Result<OrbitConfig> {
    let project_root = match &args.project {
        Some(path) => path.clone(),
        None => std::env::current_dir().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to get current directory, using '.'");
            PathBuf::from(".")
        }),
    };

    let mut loader = ConfigLoader::new().with_project_root(&project_root);
    if let Some(path) = &args.config {
        loader = loader.with_config_file(path);
    }
    loader
        .load()
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Lets the loop run until no timer is pending (when `idle_exit`) or
/// `budget` elapses. Returns the time spent waiting.
fn wait_for_idle(event_loop: &EventLoop, budget: Duration, idle_exit: bool) -> Duration {
    let started = Instant::now();
    while started.elapsed() < budget && event_loop.is_running() {
        if !drain(event_loop, started, budget) {
            break;
        }
        if idle_exit && event_loop.active_timers() == 0 {
            debug!("No pending timers, exiting early");
            break;
        }
        std::thread::sleep(IDLE_POLL.min(budget.saturating_sub(started.elapsed())));
    }
    started.elapsed()
}

/// Flushes until a round handles no emission, so events emitted by
/// callbacks run too. Returns `false` once the loop has closed.
fn drain(event_loop: &EventLoop, started: Instant, budget: Duration) -> bool {
    loop {
        let before = handled(event_loop);
        if event_loop.flush().is_err() {
            return false;
        }
        if handled(event_loop) == before || started.elapsed() >= budget {
            return true;
        }
    }
}

fn handled(event_loop: &EventLoop) -> u64 {
    let stats = event_loop.stats();
    stats.emissions + stats.dropped
}
