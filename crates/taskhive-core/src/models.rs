//! Persisted notification models and request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

/// Cause of a notification, one variant per (recipient, reason) rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// A task the recipient is assigned to was created.
    TaskCreated,
    /// The recipient was assigned to a task.
    TaskAssigned,
    /// A task the recipient is assigned to was completed.
    TaskCompleted,
    /// A task the recipient is assigned to was updated.
    TaskUpdated,
    /// The recipient was removed from a task.
    TaskUnassigned,
    /// A task's status changed.
    StatusUpdated,
    /// A new comment or a reply on something the recipient follows.
    CommentReply,
    /// The recipient was @-mentioned in a comment.
    Mention,
}

impl NotificationType {
    /// Stable wire/database name for this notification type.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TaskCreated => "task_created",
            NotificationType::TaskAssigned => "task_assigned",
            NotificationType::TaskCompleted => "task_completed",
            NotificationType::TaskUpdated => "task_updated",
            NotificationType::TaskUnassigned => "task_unassigned",
            NotificationType::StatusUpdated => "status_updated",
            NotificationType::CommentReply => "comment_reply",
            NotificationType::Mention => "mention",
        }
    }
}

/// Delivery medium a notification is eligible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
}

impl Channel {
    /// Stable wire/database name for this channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::InApp => "in_app",
            Channel::Email => "email",
        }
    }
}

/// Notification urgency, drives client-side ordering and badging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Stable wire/database name for this priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// A persisted per-recipient notification record.
///
/// Exclusively owned by `target_id`: every read or mutation is scoped to
/// that user, and `target_id` never equals `author_id` for self-triggered
/// events (the consumers exclude the actor before persisting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// The acting user that caused this notification.
    pub author_id: Uuid,
    /// The recipient that owns this notification.
    pub target_id: Uuid,
    pub notification_type: NotificationType,
    pub subject: String,
    /// Human-readable body; may embed entity names captured at fan-out time.
    pub message: String,
    pub channels: Vec<Channel>,
    pub priority: Priority,
    /// Deep link into the client, optionally carrying a `highlight` hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Opaque trace token; blank values are normalized to `None` on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    pub read_status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub dismissed_status: bool,
    pub created_at: DateTime<Utc>,
}

/// Insertable fields for a new notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    pub author_id: Uuid,
    pub target_id: Uuid,
    pub notification_type: NotificationType,
    pub subject: String,
    pub message: String,
    pub channels: Vec<Channel>,
    pub priority: Priority,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
}

impl CreateNotificationRequest {
    /// Whether this draft is eligible for email delivery.
    pub fn wants_email(&self) -> bool {
        self.channels.contains(&Channel::Email)
    }
}

/// Requester-scoped list query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNotificationsRequest {
    /// The requesting recipient; only their notifications are visible.
    pub target_id: Uuid,
    /// Restrict to unread records.
    #[serde(default)]
    pub unread_only: bool,
    /// Include dismissed records (excluded by default).
    #[serde(default)]
    pub include_dismissed: bool,
    /// Restrict to a single notification type.
    #[serde(default)]
    pub notification_type: Option<NotificationType>,
    pub limit: i64,
    pub offset: i64,
}

impl ListNotificationsRequest {
    /// A first-page query with default filters for the given recipient.
    pub fn for_target(target_id: Uuid) -> Self {
        Self {
            target_id,
            unread_only: false,
            include_dismissed: false,
            notification_type: None,
            limit: defaults::NOTIFICATION_PAGE_SIZE,
            offset: 0,
        }
    }

    /// Clamp the limit into `1..=NOTIFICATION_PAGE_SIZE_MAX`.
    pub fn clamped_limit(&self) -> i64 {
        self.limit.clamp(1, defaults::NOTIFICATION_PAGE_SIZE_MAX)
    }
}

/// Page of notifications plus the unfiltered total for the same query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNotificationsResponse {
    pub notifications: Vec<Notification>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Minimal user profile exposed by the user directory.
///
/// A missing profile or blank `email` means "no email available" — the
/// consumers skip email delivery for that recipient without failing others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
}

impl UserProfile {
    /// Email address usable for delivery, if any.
    pub fn deliverable_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

/// Normalize an opaque metadata string: blank or whitespace-only becomes
/// `None` so the stored column is NULL rather than noise.
pub fn normalize_metadata(metadata: Option<String>) -> Option<String> {
    metadata.filter(|m| !m.trim().is_empty())
}
