//! # taskhive-notify
//!
//! The notification fan-out pipeline for taskhive.
//!
//! This crate provides:
//! - [`EventPublisher`]: fire-and-forget producer helpers for the comment
//!   and task services (publish failures never touch the business flow)
//! - Recipient resolution: per-(recipient, reason) draft building with
//!   self-exclusion and mention diffing
//! - One consumer per event family, persisting drafts in a single bulk
//!   call and triggering best-effort email per record
//! - [`NotificationPipeline`]: the worker loop draining the event bus,
//!   with a JSON ingestion boundary for external transports
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use taskhive_core::EventBus;
//! use taskhive_notify::{
//!     CommentEventConsumer, EventPublisher, NotificationPipeline, PipelineConfig,
//!     TaskEventConsumer,
//! };
//!
//! let bus = Arc::new(EventBus::new(256));
//! let comments = CommentEventConsumer::new(store.clone(), tasks, users.clone(), mailer.clone());
//! let task_events = TaskEventConsumer::new(store, users, mailer);
//!
//! let handle = NotificationPipeline::new(bus.clone(), comments, task_events,
//!     PipelineConfig::from_env()).start();
//!
//! // Business code publishes and moves on
//! let publisher = EventPublisher::new(bus);
//! publisher.task_completed(author, task_id, project_id, "Ship it", assignees);
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod comment;
pub mod consumer;
pub mod pipeline;
pub mod publisher;
pub mod recipients;
pub mod task;
pub mod testing;

// Re-export core types
pub use taskhive_core::*;

pub use comment::CommentEventConsumer;
pub use consumer::ConsumeOutcome;
pub use pipeline::{NotificationPipeline, PipelineConfig, PipelineHandle};
pub use publisher::EventPublisher;
pub use recipients::{comment_drafts, task_recipients, CommentContext};
pub use task::TaskEventConsumer;
