//! taskhive-notifyd — runs the notification fan-out pipeline.
//!
//! Connects to PostgreSQL, starts the pipeline worker on the event bus,
//! and sweeps old read notifications on a daily interval. The event bus is
//! the transport seam: an embedded deployment publishes envelopes directly,
//! while a broker adapter would feed `NotificationPipeline::ingest_json`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskhive_core::{defaults, EventBus, MailSender, NotificationStore};
use taskhive_db::{Database, PgNotificationRepository, PgTaskDirectory, PgUserDirectory};
use taskhive_mailer::SmtpMailer;
use taskhive_notify::{
    CommentEventConsumer, NotificationPipeline, PipelineConfig, TaskEventConsumer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "taskhive=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskhive=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("taskhive-notifyd.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Connect to database
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/taskhive".to_string());
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    let config = PipelineConfig::from_env();
    let bus = Arc::new(EventBus::new(config.bus_capacity));

    let store: Arc<dyn NotificationStore> =
        Arc::new(PgNotificationRepository::new(db.pool().clone()));
    let tasks = Arc::new(PgTaskDirectory::new(db.pool().clone()));
    let users = Arc::new(PgUserDirectory::new(db.pool().clone()));
    let mailer: Arc<dyn MailSender> = Arc::new(SmtpMailer::from_env()?);

    let comments =
        CommentEventConsumer::new(store.clone(), tasks, users.clone(), mailer.clone());
    let task_events = TaskEventConsumer::new(store.clone(), users, mailer);

    info!("Starting notification pipeline...");
    let handle =
        NotificationPipeline::new(bus.clone(), comments, task_events, config.clone()).start();
    info!("Notification pipeline started");

    // Daily retention sweep for read notifications
    let sweep_store = store.clone();
    let retention_days = config.retention_days;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(defaults::CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match sweep_store.cleanup(retention_days).await {
                Ok(removed) => {
                    info!(retention_days, removed, "Notification retention sweep complete")
                }
                Err(e) => warn!(error = %e, "Notification retention sweep failed"),
            }
        }
    });

    // Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    handle.shutdown().await?;
    info!("Shutdown complete");

    Ok(())
}
