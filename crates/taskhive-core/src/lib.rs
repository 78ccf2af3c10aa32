//! # taskhive-core
//!
//! Core types, traits, and routing policy for the taskhive notification
//! pipeline.
//!
//! This crate provides the foundational data structures and trait
//! definitions the other taskhive crates depend on: the event envelope and
//! tagged-union event payloads, the persisted notification model, the
//! declarative routing policy tables, and the storage/directory/mailer
//! seams.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod policy;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{
    mention_diff, CommentAnchor, EventBus, EventEnvelope, EventFamily, NotificationEvent,
};
pub use models::{
    normalize_metadata, Channel, CreateNotificationRequest, ListNotificationsRequest,
    ListNotificationsResponse, Notification, NotificationType, Priority, UserProfile,
};
pub use policy::{
    comment_body, comment_link, comment_route, comment_subject, excerpt, task_body, task_link,
    task_route, task_subject, CommentReason, CommentRoute, LinkHint, TaskRoute,
};
pub use traits::{MailSender, NotificationStore, OutboundEmail, TaskDirectory, UserDirectory};
