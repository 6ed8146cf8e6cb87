//! jobsched - cluster-aware job scheduling daemon
//!
//! Main entry point for the jobsched CLI.

mod cli;
mod jobs;

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use jobsched_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use jobsched_core::{JobRegistry, MemoryClusterCache, StaticLeader, next_execution_time, parse_cron};
use jobsched_engine::{DefaultSchedulingManager, SchedulerStart, SchedulingManager};
use jobsched_protocols::{ClusterCache, LeaderSignal};

use crate::cli::{Cli, Commands};
use crate::jobs::register_builtin_jobs;

/// Initialize tracing with console output and, when a log directory is
/// configured, a daily rolling log file.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("jobsched")
                .filename_suffix("log")
                .max_log_files(logging.max_log_files)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The guard flushes the file writer when dropped
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

/// Load the configuration, falling back to defaults when the file is missing.
fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        Ok(ConfigLoader::load(path)?)
    } else {
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    init_tracing(&config.logging)?;
    if !cli.config.exists() {
        warn!("Configuration file {} not found, using defaults", cli.config.display());
    }

    match cli.command {
        None => run(config, None).await,
        Some(Commands::Run { node_id }) => run(config, node_id).await,
        Some(Commands::Validate) => validate(&config),
        Some(Commands::Next { cron, uid, count }) => next(&config, cron, uid, count),
    }
}

/// Run the scheduler in foreground until Ctrl-C.
async fn run(mut config: Config, node_id: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting jobsched v{}", env!("CARGO_PKG_VERSION"));

    let warnings = ConfigValidator::validate(&config).into_result()?;
    for warning in &warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }

    let node_id = node_id.unwrap_or_else(|| config.engine.resolve_node_id());
    let cache: Arc<dyn ClusterCache> =
        Arc::new(MemoryClusterCache::with_ttl(config.engine.cluster_entry_ttl()));
    let registry = Arc::new(JobRegistry::new());
    register_builtin_jobs(&registry, cache.clone(), &node_id)?;

    let engine = Arc::new(
        DefaultSchedulingManager::builder()
            .node_id(node_id.clone())
            .cluster_cache(cache)
            .registry(registry)
            .heartbeat_interval(config.engine.heartbeat_interval())
            .build()?,
    );
    engine.start();
    info!(node_id = %node_id, "Scheduling engine started");

    let leader: Arc<dyn LeaderSignal> = Arc::new(StaticLeader::new(config.engine.leader));
    let start = SchedulerStart::new(engine.clone(), leader);
    let report = start.run(&mut config.jobs).await;
    info!(
        scheduled = report.scheduled.len(),
        skipped = report.skipped.len(),
        stale = report.stale_marked_failed.len(),
        "Configured jobs processed"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    engine.shutdown().await;
    for job_type in engine.completed_types().await {
        if let Some(progress) = engine.completed_progress(job_type).await {
            info!(
                job_type = %job_type,
                status = ?progress.status(),
                completed_at = ?progress.completed_at(),
                "Last completed run"
            );
        }
    }
    info!("jobsched stopped");
    Ok(())
}

/// Print the validation result of the configuration.
fn validate(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let result = ConfigValidator::validate(config);

    for error in &result.errors {
        println!("error   {}: {}", error.path, error.message);
    }
    for warning in &result.warnings {
        println!("warning {}: {}", warning.path, warning.message);
    }

    if result.is_valid() {
        println!(
            "Configuration is valid ({} jobs, {} warnings)",
            config.jobs.len(),
            result.warnings.len()
        );
        Ok(())
    } else {
        Err(format!("Configuration has {} errors", result.errors.len()).into())
    }
}

/// Print the next execution time(s) of a cron expression or a configured job.
fn next(
    config: &Config,
    cron: Option<String>,
    uid: Option<String>,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();

    if let Some(expression) = cron {
        let schedule = parse_cron(&expression)?;
        for time in schedule.after(&now).take(count.max(1)) {
            println!("{}", time.to_rfc3339());
        }
        return Ok(());
    }

    let uid = uid.unwrap_or_default();
    let job = config
        .jobs
        .iter()
        .find(|j| j.uid == uid)
        .ok_or_else(|| format!("No job with uid '{uid}' in configuration"))?;

    match next_execution_time(job, now) {
        Some(time) => println!("{}", time.to_rfc3339()),
        None => println!("{} has no next execution", job.uid),
    }
    Ok(())
}
