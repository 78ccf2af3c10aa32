//! Trait definitions for the storage, directory, and mail seams.
//!
//! PostgreSQL implementations live in `taskhive-db`; the SMTP mailer lives
//! in `taskhive-mailer`. Consumers hold `Arc<dyn …>` so tests can substitute
//! in-memory fakes.

use async_trait::async_trait;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    CreateNotificationRequest, ListNotificationsRequest, ListNotificationsResponse, Notification,
    NotificationType, UserProfile,
};

/// Persistence and query operations over recipient-scoped notifications.
///
/// Every read or mutation is scoped to the owning `target_id`; touching
/// another user's notification yields `Error::Forbidden`.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert one notification; blank metadata is normalized to NULL.
    async fn create(&self, req: CreateNotificationRequest) -> Result<Uuid>;

    /// Insert a batch in a single transaction. Empty input is a no-op.
    async fn create_bulk(&self, reqs: Vec<CreateNotificationRequest>) -> Result<Vec<Uuid>>;

    /// Fetch one notification, enforcing ownership.
    async fn fetch(&self, id: Uuid, requester: Uuid) -> Result<Notification>;

    /// Paginated, filtered list for the requesting recipient.
    async fn list(&self, req: ListNotificationsRequest) -> Result<ListNotificationsResponse>;

    /// Count of unread, undismissed notifications for a recipient.
    async fn unread_count(&self, target_id: Uuid) -> Result<i64>;

    /// Mark one notification read. Returns `false` (no write) when it was
    /// already read; `Error::Forbidden` when `requester` is not the owner.
    async fn mark_read(&self, id: Uuid, requester: Uuid) -> Result<bool>;

    /// Mark a set of the requester's notifications read; returns the number
    /// actually updated. Ids owned by other users are ignored.
    async fn mark_read_bulk(&self, ids: &[Uuid], requester: Uuid) -> Result<i64>;

    /// Mark everything unread for the requester as read.
    async fn mark_all_read(&self, requester: Uuid) -> Result<i64>;

    /// Dismiss one notification; mirrors the read semantics with its own flag.
    async fn dismiss(&self, id: Uuid, requester: Uuid) -> Result<bool>;

    /// Permanently delete one notification, enforcing ownership.
    async fn delete(&self, id: Uuid, requester: Uuid) -> Result<()>;

    /// Whether an equivalent (author, target, type) notification was created
    /// within the trailing window. Supports caller-side debouncing.
    async fn has_recent_similar(
        &self,
        author_id: Uuid,
        target_id: Uuid,
        notification_type: NotificationType,
        within_minutes: i64,
    ) -> Result<bool>;

    /// Delete read notifications older than `days_to_keep`; returns the
    /// count removed.
    async fn cleanup(&self, days_to_keep: i64) -> Result<i64>;
}

/// Task metadata lookups consumed by the comment consumer.
///
/// A missing entity resolves to `None`/empty — never a hard failure inside
/// a consumer; the task tables belong to the wider backend.
#[async_trait]
pub trait TaskDirectory: Send + Sync {
    /// Title of a task, if it still exists.
    async fn task_title(&self, task_id: Uuid) -> Result<Option<String>>;

    /// Current assignees of a task. Missing task yields an empty list.
    async fn assignee_ids(&self, task_id: Uuid) -> Result<Vec<Uuid>>;

    /// Parent task of a subtask, if the subtask exists.
    async fn parent_task_of_subtask(&self, subtask_id: Uuid) -> Result<Option<Uuid>>;
}

/// User profile lookups consumed for email addressing and actor naming.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Profile for a user id; `None` when unknown.
    async fn user_profile(&self, id: Uuid) -> Result<Option<UserProfile>>;
}

/// A rendered email ready for submission.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Non-blocking email submission.
///
/// `send` returns immediately; delivery runs in a spawned task whose
/// success/failure is reported only through the returned handle (and the
/// log). Callers that don't care drop the handle — failures never raise
/// past this boundary.
pub trait MailSender: Send + Sync {
    fn send(&self, email: OutboundEmail) -> JoinHandle<Result<()>>;
}
