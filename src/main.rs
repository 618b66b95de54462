use std::{error::Error, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

mod app_metrics;
mod config;
mod db;
mod location;
mod mission;
mod mission_tracker;
mod store;
mod utilities;
mod web;

use app_metrics::{AppMetrics, MetricsLogger};
use config::{Config, MissionConfig};
use db::{HealthCheckManager, MissionDatabase};
use mission_tracker::MissionTracker;
use utilities::{Clock, SystemClock};
use web::api::{AppState, SharedTracker};
use web::server::start_web_server;

// ========== Logging Setup ==========

fn init_logging(log_config: &config::LogConfig) -> Result<(), Box<dyn Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
    use tracing_appender::rolling;

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&log_config.directory)?;

    // Create daily rolling file appender
    let file_appender = rolling::daily(&log_config.directory, &log_config.file_prefix);

    // Build subscriber with both console and file output
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_timer(fmt::time::OffsetTime::local_rfc_3339().unwrap_or_else(|_| fmt::time::OffsetTime::new(
            time::UtcOffset::UTC,
            time::format_description::well_known::Rfc3339,
        )));

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_timer(fmt::time::OffsetTime::local_rfc_3339().unwrap_or_else(|_| fmt::time::OffsetTime::new(
            time::UtcOffset::UTC,
            time::format_description::well_known::Rfc3339,
        )));

    // Parse log level from config
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ========== Background Tasks ==========

/// Advances the active mission's elapsed time and runs the periodic
/// metrics and database health reports.
async fn run_background_tasks(
    tracker: SharedTracker,
    metrics: Arc<std::sync::Mutex<AppMetrics>>,
    db: Arc<MissionDatabase>,
    mission_config: MissionConfig,
) {
    let mut interval = tokio::time::interval(mission_config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut metrics_logger = MetricsLogger::new(mission_config.metrics_interval());
    let mut db_health_check = HealthCheckManager::new(Duration::from_secs(60));
    let clock = SystemClock;

    loop {
        interval.tick().await;

        // Skip the tick rather than wait behind a lifecycle call holding the tracker
        if let Ok(mut active) = tracker.try_lock() && active.is_active() {
            match active.tick(clock.now_ms()) {
                Ok(elapsed) => debug!("Mission tick: {} s elapsed", elapsed),
                Err(e) => debug!("Mission tick skipped: {}", e),
            }
        }

        if let Ok(mut metrics) = metrics.lock() {
            metrics_logger.check_and_log(&mut metrics);
        }

        db_health_check.check(&db).await;
    }
}

async fn run(config: Config, database: MissionDatabase) -> Result<(), Box<dyn Error>> {
    let db = Arc::new(database);
    let tracker: SharedTracker = Arc::new(Mutex::new(MissionTracker::new((*db).clone(), SystemClock)));
    let metrics = Arc::new(std::sync::Mutex::new(AppMetrics::new()));

    tokio::spawn(run_background_tasks(
        Arc::clone(&tracker),
        Arc::clone(&metrics),
        Arc::clone(&db),
        config.mission.clone(),
    ));

    let state = AppState::new(db, tracker, metrics);
    start_web_server(state, &config.web).await
}

// ========== Main Application ==========

fn main() -> Result<(), Box<dyn Error>> {
    // Check for command-line arguments
    let args: Vec<String> = std::env::args().collect();

    // Check for help flag
    if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
        println!("Field Missions Service");
        println!();
        println!("USAGE:");
        println!("    field_missions [OPTIONS]");
        println!();
        println!("OPTIONS:");
        println!("    --validate-config, --validate, -v    Validate configuration and exit");
        println!("    --help, -h                           Show this help message");
        println!();
        println!("Configuration file: config.json (in current directory)");
        std::process::exit(0);
    }

    let validate_only = args.contains(&"--validate-config".to_string())
                     || args.contains(&"--validate".to_string())
                     || args.contains(&"-v".to_string());

    // Load configuration
    let config = match Config::from_file("config.json") {
        Ok(cfg) => {
            if validate_only {
                println!("✓ Configuration validation successful");
                println!("  Database: {}@{}", cfg.database.connection.username, cfg.database.connection.host);
                println!("  Web server: port {}, static files from {}", cfg.web.port, cfg.web.static_dir);
                println!("  Mission tick interval: {} ms", cfg.mission.tick_interval_ms);
                println!("  Metrics interval: {} s", cfg.mission.metrics_interval_seconds);
                std::process::exit(0);
            }
            cfg
        },
        Err(e) => {
            if validate_only {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            eprintln!("Warning: Could not load config.json: {}", e);
            eprintln!("Using default configuration");
            Config::default()
        }
    };

    // Initialize logging
    init_logging(&config.logging)?;
    info!("Field Missions service starting...");
    info!("Loaded configuration");

    // Missions cannot be recorded without the database
    let db_url = config.database.connection.connection_url();
    let Some(database) = MissionDatabase::connect_with_retry(&db_url, 5) else {
        error!("Database unavailable, exiting");
        std::process::exit(1);
    };
    database.warn_stale_active_missions();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(config, database))
}
