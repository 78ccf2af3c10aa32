//! Producer-side publishing: typed helpers the comment and task services
//! call after a successful state change.
//!
//! Publishing is strictly fire-and-forget. Nothing here returns an error
//! and nothing blocks beyond the broadcast send — a publish problem must
//! never fail or roll back the business transaction that triggered it.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use taskhive_core::{mention_diff, CommentAnchor, EventBus, EventEnvelope, NotificationEvent};

/// Handle the business services use to emit notification events.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<EventBus>,
}

impl EventPublisher {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Publish a pre-built envelope. Infallible by contract.
    pub fn publish(&self, envelope: EventEnvelope) {
        self.bus.publish(envelope);
    }

    fn emit(&self, author_id: Uuid, payload: NotificationEvent) {
        self.publish(EventEnvelope::new(author_id, payload));
    }

    /// A top-level comment was created.
    #[allow(clippy::too_many_arguments)]
    pub fn comment_created(
        &self,
        author_id: Uuid,
        comment_id: Uuid,
        anchor: CommentAnchor,
        content: &str,
        task_title: &str,
        mentioned_user_ids: Vec<Uuid>,
    ) {
        self.emit(
            author_id,
            NotificationEvent::CommentCreated {
                comment_id,
                anchor,
                content: content.to_string(),
                task_title: task_title.to_string(),
                mentioned_user_ids,
            },
        );
    }

    /// A reply was posted under an existing comment.
    #[allow(clippy::too_many_arguments)]
    pub fn comment_reply(
        &self,
        author_id: Uuid,
        comment_id: Uuid,
        anchor: CommentAnchor,
        content: &str,
        task_title: &str,
        parent_comment_author_id: Uuid,
    ) {
        self.emit(
            author_id,
            NotificationEvent::CommentReply {
                comment_id,
                anchor,
                content: content.to_string(),
                task_title: task_title.to_string(),
                parent_comment_author_id,
            },
        );
    }

    /// A comment was edited. Only users mentioned by the edit and not by
    /// the previous revision are renotified; when the diff is empty no
    /// event is published at all. Returns the number of added mentions.
    #[allow(clippy::too_many_arguments)]
    pub fn comment_edited(
        &self,
        author_id: Uuid,
        comment_id: Uuid,
        anchor: CommentAnchor,
        content: &str,
        task_title: &str,
        old_mentions: &[Uuid],
        new_mentions: &[Uuid],
    ) -> usize {
        let added = mention_diff(old_mentions, new_mentions);
        if added.is_empty() {
            debug!(
                subsystem = "notify",
                component = "publisher",
                %comment_id,
                "Comment edit added no mentions, nothing to publish"
            );
            return 0;
        }

        let count = added.len();
        self.emit(
            author_id,
            NotificationEvent::Mention {
                comment_id,
                anchor,
                content: content.to_string(),
                task_title: task_title.to_string(),
                mentioned_user_ids: added,
            },
        );
        count
    }

    /// A task was created with assignees.
    #[allow(clippy::too_many_arguments)]
    pub fn task_created(
        &self,
        author_id: Uuid,
        task_id: Uuid,
        project_id: Uuid,
        task_title: &str,
        task_description: &str,
        assigned_user_ids: Vec<Uuid>,
    ) {
        self.emit(
            author_id,
            NotificationEvent::TaskCreated {
                task_id,
                project_id,
                task_title: task_title.to_string(),
                task_description: task_description.to_string(),
                assigned_user_ids,
            },
        );
    }

    /// Users were assigned to an existing task.
    pub fn task_assigned(
        &self,
        author_id: Uuid,
        task_id: Uuid,
        project_id: Uuid,
        task_title: &str,
        assigned_user_ids: Vec<Uuid>,
    ) {
        self.emit(
            author_id,
            NotificationEvent::TaskAssigned {
                task_id,
                project_id,
                task_title: task_title.to_string(),
                assigned_user_ids,
            },
        );
    }

    /// A task was completed.
    pub fn task_completed(
        &self,
        author_id: Uuid,
        task_id: Uuid,
        project_id: Uuid,
        task_title: &str,
        assigned_user_ids: Vec<Uuid>,
    ) {
        self.emit(
            author_id,
            NotificationEvent::TaskCompleted {
                task_id,
                project_id,
                task_title: task_title.to_string(),
                assigned_user_ids,
            },
        );
    }

    /// A task's fields changed.
    #[allow(clippy::too_many_arguments)]
    pub fn task_updated(
        &self,
        author_id: Uuid,
        task_id: Uuid,
        project_id: Uuid,
        task_title: &str,
        task_status: &str,
        assigned_user_ids: Vec<Uuid>,
    ) {
        self.emit(
            author_id,
            NotificationEvent::TaskUpdated {
                task_id,
                project_id,
                task_title: task_title.to_string(),
                task_status: task_status.to_string(),
                assigned_user_ids,
            },
        );
    }

    /// Users were removed from a task.
    pub fn task_unassigned(
        &self,
        author_id: Uuid,
        task_id: Uuid,
        project_id: Uuid,
        task_title: &str,
        assigned_user_ids: Vec<Uuid>,
    ) {
        self.emit(
            author_id,
            NotificationEvent::TaskUnassigned {
                task_id,
                project_id,
                task_title: task_title.to_string(),
                assigned_user_ids,
            },
        );
    }

    /// A task moved between workflow statuses.
    #[allow(clippy::too_many_arguments)]
    pub fn status_changed(
        &self,
        author_id: Uuid,
        task_id: Uuid,
        project_id: Uuid,
        task_title: &str,
        prev_task_status: &str,
        task_status: &str,
        assigned_user_ids: Vec<Uuid>,
    ) {
        self.emit(
            author_id,
            NotificationEvent::StatusUpdated {
                task_id,
                project_id,
                task_title: task_title.to_string(),
                task_status: task_status.to_string(),
                prev_task_status: prev_task_status.to_string(),
                assigned_user_ids,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (EventPublisher, tokio::sync::broadcast::Receiver<EventEnvelope>) {
        let bus = Arc::new(EventBus::new(32));
        let rx = bus.subscribe();
        (EventPublisher::new(bus), rx)
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_fail() {
        let publisher = EventPublisher::new(Arc::new(EventBus::new(32)));
        publisher.task_completed(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Ship the release",
            vec![Uuid::new_v4()],
        );
    }

    #[tokio::test]
    async fn test_comment_created_reaches_subscriber() {
        let (publisher, mut rx) = setup();
        let author = Uuid::new_v4();

        publisher.comment_created(
            author,
            Uuid::new_v4(),
            CommentAnchor::Task(Uuid::new_v4()),
            "looks good",
            "Ship the release",
            vec![Uuid::new_v4()],
        );

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.author_id, author);
        assert_eq!(envelope.payload.event_type(), "COMMENT_CREATED");
    }

    #[tokio::test]
    async fn test_comment_edited_publishes_only_added_mentions() {
        let (publisher, mut rx) = setup();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let added = publisher.comment_edited(
            Uuid::new_v4(),
            Uuid::new_v4(),
            CommentAnchor::Task(Uuid::new_v4()),
            "edited text",
            "Ship the release",
            &[a, b],
            &[b, c],
        );
        assert_eq!(added, 1);

        let envelope = rx.recv().await.unwrap();
        match envelope.payload {
            NotificationEvent::Mention {
                mentioned_user_ids, ..
            } => assert_eq!(mentioned_user_ids, vec![c]),
            other => panic!("Expected Mention, got {}", other.event_type()),
        }
    }

    #[tokio::test]
    async fn test_comment_edited_with_no_new_mentions_publishes_nothing() {
        let (publisher, mut rx) = setup();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let added = publisher.comment_edited(
            Uuid::new_v4(),
            Uuid::new_v4(),
            CommentAnchor::Task(Uuid::new_v4()),
            "edited text",
            "Ship the release",
            &[a, b],
            // b removed, a kept: nothing added
            &[a],
        );
        assert_eq!(added, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_status_changed_event_shape() {
        let (publisher, mut rx) = setup();

        publisher.status_changed(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Ship the release",
            "in_review",
            "done",
            vec![Uuid::new_v4()],
        );

        let envelope = rx.recv().await.unwrap();
        match envelope.payload {
            NotificationEvent::StatusUpdated {
                task_status,
                prev_task_status,
                ..
            } => {
                assert_eq!(task_status, "done");
                assert_eq!(prev_task_status, "in_review");
            }
            other => panic!("Expected StatusUpdated, got {}", other.event_type()),
        }
    }
}
