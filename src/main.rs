//! # recron — periodic tasks with runtime-mutable cron schedules
//!
//! Each task reports its desired cron expression on every polling cycle;
//! the rescheduling loop swaps timers when it changes. The expression
//! `"-"` suspends a task until it changes back.
//!
//! Usage:
//!   recron                          # defaults (~/.recron/config.toml)
//!   recron --port 9090 --tick 2     # override gateway port / tick interval
//!   recron --config recron.toml     # explicit config file

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use recron_core::RecronConfig;
use recron_gateway::AppState;
use recron_scheduler::{
    ConfiguredTask, ExpressionCell, FixedTask, Rescheduler, TogglingTask, spawn_rescheduler,
};

#[derive(Parser)]
#[command(
    name = "recron",
    version,
    about = "⏰ recron — periodic tasks with runtime-mutable cron schedules"
)]
struct Cli {
    /// Gateway port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Tick interval in seconds (overrides config)
    #[arg(long = "tick")]
    tick_interval: Option<u64>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "recron=debug,recron_scheduler=debug,recron_gateway=debug,tower_http=debug"
    } else {
        "recron=info,recron_scheduler=info,recron_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => RecronConfig::load_from(Path::new(path))?,
        None => RecronConfig::load()?,
    };
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(tick) = cli.tick_interval {
        config.scheduler.tick_interval_secs = tick;
    }
    tracing::info!(
        "📋 Config: tick every {}s, initial expression '{}'",
        config.scheduler.tick_interval_secs,
        config.tasks.initial_expression
    );

    // Explicit wiring: the shared expression cell feeds the configured
    // task and is the only thing the gateway mutates.
    let cell = ExpressionCell::new(config.tasks.initial_expression.clone());

    let mut engine = Rescheduler::new();
    engine.register(Arc::new(ConfiguredTask::new("foo", Arc::clone(&cell))));
    engine.register(Arc::new(FixedTask::new(
        "bar",
        &config.tasks.fixed_expression,
    )));
    if config.tasks.register_toggler {
        engine.register(Arc::new(TogglingTask::new(
            "flip",
            &config.tasks.fixed_expression,
        )));
    }
    let engine = Arc::new(Mutex::new(engine));

    tokio::spawn(spawn_rescheduler(
        Arc::clone(&engine),
        config.scheduler.tick_interval_secs,
    ));

    if config.gateway.enabled {
        let state = AppState { cell, engine };
        recron_gateway::serve(state, &config.gateway.host, config.gateway.port).await?;
    } else {
        // Headless mode: the rescheduler runs until the process is killed.
        std::future::pending::<()>().await;
    }

    Ok(())
}
