//! Pipeline worker: drains the event bus and drives one consumer per
//! event family.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use taskhive_core::{defaults, Error, EventBus, EventEnvelope, EventFamily, Result};

use crate::comment::CommentEventConsumer;
use crate::consumer::ConsumeOutcome;
use crate::task::TaskEventConsumer;

/// Configuration for the notification pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Whether event processing is enabled.
    pub enabled: bool,
    /// Buffer capacity for the event bus feeding the pipeline.
    pub bus_capacity: usize,
    /// Days a read notification is retained before cleanup removes it.
    pub retention_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bus_capacity: defaults::EVENT_BUS_CAPACITY,
            retention_days: defaults::NOTIFICATION_RETENTION_DAYS,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTIFY_PIPELINE_ENABLED` | `true` | Enable/disable event processing |
    /// | `NOTIFY_BUS_CAPACITY` | `256` | Event bus buffer capacity |
    /// | `NOTIFICATION_RETENTION_DAYS` | `90` | Retention window for read records |
    pub fn from_env() -> Self {
        let enabled = std::env::var("NOTIFY_PIPELINE_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let bus_capacity = std::env::var("NOTIFY_BUS_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::EVENT_BUS_CAPACITY)
            .max(1);

        let retention_days = std::env::var("NOTIFICATION_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults::NOTIFICATION_RETENTION_DAYS)
            .max(1);

        Self {
            enabled,
            bus_capacity,
            retention_days,
        }
    }

    /// Enable or disable event processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the event bus buffer capacity.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Set the retention window in days.
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }
}

/// Handle for controlling a running pipeline.
pub struct PipelineHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl PipelineHandle {
    /// Signal the pipeline to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }
}

/// The fan-out worker: one subscription on the bus, one envelope processed
/// to completion at a time.
///
/// Consumer errors (storage failures) are logged here with the message id
/// as dead-letter candidates; an external durable transport would hook
/// [`NotificationPipeline::ingest_json`] instead and use the returned
/// `Result` to drive retry/dead-lettering.
pub struct NotificationPipeline {
    bus: Arc<EventBus>,
    comments: CommentEventConsumer,
    tasks: TaskEventConsumer,
    config: PipelineConfig,
}

impl NotificationPipeline {
    pub fn new(
        bus: Arc<EventBus>,
        comments: CommentEventConsumer,
        tasks: TaskEventConsumer,
        config: PipelineConfig,
    ) -> Self {
        Self {
            bus,
            comments,
            tasks,
            config,
        }
    }

    /// Start the pipeline and return a handle for control.
    pub fn start(self) -> PipelineHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let pipeline = Arc::new(self);
        tokio::spawn(async move {
            pipeline.run(&mut shutdown_rx).await;
        });

        PipelineHandle { shutdown_tx }
    }

    /// Run the receive loop until shutdown or bus closure.
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(
                subsystem = "notify",
                component = "pipeline",
                "Notification pipeline is disabled, not starting"
            );
            return;
        }

        info!(
            subsystem = "notify",
            component = "pipeline",
            "Notification pipeline started"
        );

        let mut rx = self.bus.subscribe();
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(
                        subsystem = "notify",
                        component = "pipeline",
                        "Pipeline received shutdown signal"
                    );
                    break;
                }
                received = rx.recv() => match received {
                    Ok(envelope) => {
                        let _ = self.dispatch(&envelope).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(
                            subsystem = "notify",
                            component = "pipeline",
                            missed,
                            "Pipeline lagged behind the event bus"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }

        info!(
            subsystem = "notify",
            component = "pipeline",
            "Notification pipeline stopped"
        );
    }

    /// Route one envelope to its family's consumer and log the outcome.
    ///
    /// The returned error is always a storage failure — the one class the
    /// transport is expected to retry or dead-letter.
    pub async fn dispatch(&self, envelope: &EventEnvelope) -> Result<ConsumeOutcome> {
        let start = Instant::now();
        let result = match envelope.payload.family() {
            EventFamily::Comment => self.comments.handle(envelope).await,
            EventFamily::Task => self.tasks.handle(envelope).await,
        };

        match &result {
            Ok(ConsumeOutcome::Delivered { persisted, emails }) => {
                debug!(
                    subsystem = "notify",
                    component = "pipeline",
                    message_id = %envelope.message_id,
                    event_type = envelope.payload.event_type(),
                    persisted,
                    emails,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Event processed"
                );
            }
            Ok(ConsumeOutcome::Skipped) => {
                debug!(
                    subsystem = "notify",
                    component = "pipeline",
                    message_id = %envelope.message_id,
                    event_type = envelope.payload.event_type(),
                    "Event produced no notifications"
                );
            }
            Err(e) => {
                error!(
                    subsystem = "notify",
                    component = "pipeline",
                    message_id = %envelope.message_id,
                    event_type = envelope.payload.event_type(),
                    error = %e,
                    "Event processing failed, dead-letter candidate"
                );
            }
        }

        result
    }

    /// Transport ingestion boundary: parse and dispatch one raw event.
    ///
    /// Malformed payloads and unknown event types are logged and dropped
    /// without error (forward compatible with producers shipping new types
    /// ahead of this consumer). Only storage failures surface, so a broker
    /// adapter can nack exactly the events worth retrying.
    pub async fn ingest_json(&self, raw: &str) -> Result<()> {
        let envelope: EventEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    subsystem = "notify",
                    component = "pipeline",
                    error = %e,
                    "Dropping malformed or unknown event"
                );
                return Ok(());
            }
        };
        self.dispatch(&envelope).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        MemoryNotificationStore, RecordingMailer, StaticTaskDirectory, StaticUserDirectory,
    };
    use taskhive_core::NotificationEvent;
    use uuid::Uuid;

    struct Fixture {
        bus: Arc<EventBus>,
        store: Arc<MemoryNotificationStore>,
        mailer: Arc<RecordingMailer>,
        pipeline: NotificationPipeline,
    }

    fn fixture(tasks: StaticTaskDirectory, users: StaticUserDirectory) -> Fixture {
        let bus = Arc::new(EventBus::new(32));
        let store = Arc::new(MemoryNotificationStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let users = Arc::new(users);
        let comments = CommentEventConsumer::new(
            store.clone(),
            Arc::new(tasks),
            users.clone(),
            mailer.clone(),
        );
        let task_consumer = TaskEventConsumer::new(store.clone(), users, mailer.clone());
        let pipeline = NotificationPipeline::new(
            bus.clone(),
            comments,
            task_consumer,
            PipelineConfig::default(),
        );
        Fixture {
            bus,
            store,
            mailer,
            pipeline,
        }
    }

    fn assigned_event(author: Uuid, assignee: Uuid) -> EventEnvelope {
        EventEnvelope::new(
            author,
            NotificationEvent::TaskAssigned {
                task_id: Uuid::new_v4(),
                project_id: Uuid::new_v4(),
                task_title: "Ship the release".to_string(),
                assigned_user_ids: vec![assignee],
            },
        )
    }

    #[test]
    fn test_pipeline_config_default_and_builders() {
        let config = PipelineConfig::default();
        assert!(config.enabled);
        assert_eq!(config.bus_capacity, defaults::EVENT_BUS_CAPACITY);
        assert_eq!(config.retention_days, defaults::NOTIFICATION_RETENTION_DAYS);

        let config = PipelineConfig::default()
            .with_enabled(false)
            .with_bus_capacity(8)
            .with_retention_days(7);
        assert!(!config.enabled);
        assert_eq!(config.bus_capacity, 8);
        assert_eq!(config.retention_days, 7);
    }

    #[tokio::test]
    async fn test_ingest_json_valid_event_persists() {
        let a = Uuid::new_v4();
        let f = fixture(
            StaticTaskDirectory::new(),
            StaticUserDirectory::new().with_user(a, "Ada", Some("ada@example.com")),
        );

        let raw = serde_json::to_string(&assigned_event(Uuid::new_v4(), a)).unwrap();
        f.pipeline.ingest_json(&raw).await.unwrap();

        assert_eq!(f.store.all().len(), 1);
        assert_eq!(f.mailer.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_ingest_json_drops_malformed_without_error() {
        let f = fixture(StaticTaskDirectory::new(), StaticUserDirectory::new());

        f.pipeline.ingest_json("not json at all").await.unwrap();
        f.pipeline.ingest_json("{\"half\": true").await.unwrap();

        assert!(f.store.all().is_empty());
        assert_eq!(f.store.bulk_calls(), 0);
    }

    #[tokio::test]
    async fn test_ingest_json_drops_unknown_event_type_without_error() {
        let f = fixture(StaticTaskDirectory::new(), StaticUserDirectory::new());

        let raw = format!(
            r#"{{"message_id":"{id}","author_id":"{id}","occurred_at":"2026-06-01T00:00:00Z",
                "payload":{{"type":"TASK_ARCHIVED","task_id":"{id}"}}}}"#,
            id = Uuid::nil()
        );
        f.pipeline.ingest_json(&raw).await.unwrap();

        assert!(f.store.all().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_json_surfaces_storage_failures() {
        let a = Uuid::new_v4();
        let f = fixture(
            StaticTaskDirectory::new(),
            StaticUserDirectory::new().with_user(a, "Ada", Some("ada@example.com")),
        );
        f.store.fail_next_bulk();

        let raw = serde_json::to_string(&assigned_event(Uuid::new_v4(), a)).unwrap();
        assert!(f.pipeline.ingest_json(&raw).await.is_err());
    }

    #[tokio::test]
    async fn test_started_pipeline_processes_bus_events() {
        let a = Uuid::new_v4();
        let f = fixture(
            StaticTaskDirectory::new(),
            StaticUserDirectory::new().with_user(a, "Ada", Some("ada@example.com")),
        );

        let bus = f.bus.clone();
        let store = f.store.clone();
        let handle = f.pipeline.start();

        bus.publish(assigned_event(Uuid::new_v4(), a));

        // Give the worker a moment to drain the bus
        for _ in 0..50 {
            if !store.all().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(store.all().len(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_pipeline_processes_nothing() {
        let a = Uuid::new_v4();
        let mut f = fixture(
            StaticTaskDirectory::new(),
            StaticUserDirectory::new().with_user(a, "Ada", Some("ada@example.com")),
        );
        f.pipeline.config = PipelineConfig::default().with_enabled(false);

        let bus = f.bus.clone();
        let store = f.store.clone();
        let _handle = f.pipeline.start();

        bus.publish(assigned_event(Uuid::new_v4(), a));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(store.all().is_empty());
    }
}
