//! Notification event types, envelope schema, and the event bus.
//!
//! Business actions in the comment and task services publish one
//! [`EventEnvelope`] per state change onto the [`EventBus`]; the pipeline
//! consumers subscribe and fan each event out into per-recipient
//! notifications. The envelope carries the trace token and actor while the
//! `payload` holds the per-event-type data as an explicit sum type — a
//! payload missing a variant's required fields fails deserialization at the
//! transport boundary instead of surfacing as null checks in consumer logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::sync::broadcast;
use uuid::Uuid;

// ============================================================================
// Comment anchor
// ============================================================================

/// What a comment hangs off: a task directly, or a subtask of a task.
///
/// Exactly one of `task_id`/`subtask_id` is present on the wire; anything
/// else is rejected during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAnchor {
    Task(Uuid),
    Subtask(Uuid),
}

impl CommentAnchor {
    /// The task id, when anchored directly to a task.
    pub fn task_id(&self) -> Option<Uuid> {
        match self {
            CommentAnchor::Task(id) => Some(*id),
            CommentAnchor::Subtask(_) => None,
        }
    }

    /// The subtask id, when anchored to a subtask.
    pub fn subtask_id(&self) -> Option<Uuid> {
        match self {
            CommentAnchor::Task(_) => None,
            CommentAnchor::Subtask(id) => Some(*id),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct AnchorWire {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    task_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    subtask_id: Option<Uuid>,
}

impl Serialize for CommentAnchor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            CommentAnchor::Task(id) => AnchorWire {
                task_id: Some(*id),
                subtask_id: None,
            },
            CommentAnchor::Subtask(id) => AnchorWire {
                task_id: None,
                subtask_id: Some(*id),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CommentAnchor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = AnchorWire::deserialize(deserializer)?;
        match (wire.task_id, wire.subtask_id) {
            (Some(task_id), None) => Ok(CommentAnchor::Task(task_id)),
            (None, Some(subtask_id)) => Ok(CommentAnchor::Subtask(subtask_id)),
            _ => Err(serde::de::Error::custom(
                "comment anchor requires exactly one of task_id/subtask_id",
            )),
        }
    }
}

// ============================================================================
// Event payloads
// ============================================================================

/// Family of a notification event, one consumer per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFamily {
    Comment,
    Task,
}

/// Domain payload of a notification event, keyed by a `type` tag.
///
/// Comment-family variants carry the comment, its anchor, and the task title
/// snapshot taken when the event was built. Task-family variants carry the
/// task facts a consumer needs to route without re-reading the task row.
/// Permission decisions are never carried — they are recomputed downstream
/// per recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    /// A new top-level comment was posted.
    CommentCreated {
        comment_id: Uuid,
        #[serde(flatten)]
        anchor: CommentAnchor,
        content: String,
        task_title: String,
        /// Ordered @-mention list; may be empty.
        mentioned_user_ids: Vec<Uuid>,
    },
    /// A reply was posted under an existing comment.
    CommentReply {
        comment_id: Uuid,
        #[serde(flatten)]
        anchor: CommentAnchor,
        content: String,
        task_title: String,
        parent_comment_author_id: Uuid,
    },
    /// Users were @-mentioned; on comment edits this carries only the
    /// mentions *added* by the edit.
    Mention {
        comment_id: Uuid,
        #[serde(flatten)]
        anchor: CommentAnchor,
        content: String,
        task_title: String,
        mentioned_user_ids: Vec<Uuid>,
    },
    /// A task was created with assignees.
    TaskCreated {
        task_id: Uuid,
        project_id: Uuid,
        task_title: String,
        task_description: String,
        assigned_user_ids: Vec<Uuid>,
    },
    /// Users were assigned to an existing task.
    TaskAssigned {
        task_id: Uuid,
        project_id: Uuid,
        task_title: String,
        assigned_user_ids: Vec<Uuid>,
    },
    /// A task was completed.
    TaskCompleted {
        task_id: Uuid,
        project_id: Uuid,
        task_title: String,
        assigned_user_ids: Vec<Uuid>,
    },
    /// A task's fields changed.
    TaskUpdated {
        task_id: Uuid,
        project_id: Uuid,
        task_title: String,
        task_status: String,
        assigned_user_ids: Vec<Uuid>,
    },
    /// Users were removed from a task.
    TaskUnassigned {
        task_id: Uuid,
        project_id: Uuid,
        task_title: String,
        assigned_user_ids: Vec<Uuid>,
    },
    /// A task moved between workflow statuses.
    StatusUpdated {
        task_id: Uuid,
        project_id: Uuid,
        task_title: String,
        task_status: String,
        prev_task_status: String,
        assigned_user_ids: Vec<Uuid>,
    },
}

impl NotificationEvent {
    /// Returns the wire name of this event type (matches the serde tag).
    pub fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::CommentCreated { .. } => "COMMENT_CREATED",
            NotificationEvent::CommentReply { .. } => "COMMENT_REPLY",
            NotificationEvent::Mention { .. } => "MENTION",
            NotificationEvent::TaskCreated { .. } => "TASK_CREATED",
            NotificationEvent::TaskAssigned { .. } => "TASK_ASSIGNED",
            NotificationEvent::TaskCompleted { .. } => "TASK_COMPLETED",
            NotificationEvent::TaskUpdated { .. } => "TASK_UPDATED",
            NotificationEvent::TaskUnassigned { .. } => "TASK_UNASSIGNED",
            NotificationEvent::StatusUpdated { .. } => "STATUS_UPDATED",
        }
    }

    /// Returns the consumer family this event belongs to.
    pub fn family(&self) -> EventFamily {
        match self {
            NotificationEvent::CommentCreated { .. }
            | NotificationEvent::CommentReply { .. }
            | NotificationEvent::Mention { .. } => EventFamily::Comment,
            NotificationEvent::TaskCreated { .. }
            | NotificationEvent::TaskAssigned { .. }
            | NotificationEvent::TaskCompleted { .. }
            | NotificationEvent::TaskUpdated { .. }
            | NotificationEvent::TaskUnassigned { .. }
            | NotificationEvent::StatusUpdated { .. } => EventFamily::Task,
        }
    }
}

// ============================================================================
// Event envelope
// ============================================================================

/// Transport envelope around a [`NotificationEvent`].
///
/// `message_id` is a UUIDv7 dedup/trace token; it is copied into each
/// persisted notification's metadata so operators can correlate a record
/// back to the event that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub message_id: Uuid,
    /// The acting user that caused the event. Never notified.
    pub author_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: NotificationEvent,
}

impl EventEnvelope {
    /// Wrap a payload with a fresh UUIDv7 message id stamped now.
    pub fn new(author_id: Uuid, payload: NotificationEvent) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            author_id,
            occurred_at: Utc::now(),
            payload,
        }
    }
}

// ============================================================================
// Mention diff
// ============================================================================

/// Set difference `new − old`, preserving `new`'s order and dropping
/// duplicates. Used on comment edits so only newly mentioned users are
/// renotified; removed or unchanged mentions generate nothing.
pub fn mention_diff(old: &[Uuid], new: &[Uuid]) -> Vec<Uuid> {
    let previous: std::collections::HashSet<Uuid> = old.iter().copied().collect();
    let mut seen = std::collections::HashSet::new();
    new.iter()
        .copied()
        .filter(|id| !previous.contains(id) && seen.insert(*id))
        .collect()
}

// ============================================================================
// Event bus
// ============================================================================

/// Broadcast-based bus carrying event envelopes from producers to the
/// pipeline.
///
/// Uses `tokio::sync::broadcast` with a configurable buffer size. Publishing
/// never fails and never blocks: with no active subscribers the envelope is
/// silently dropped, and a slow subscriber that falls behind receives a
/// `Lagged` error and misses events. An external durable broker can replace
/// this bus without touching the consumers; they only see envelopes.
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an envelope to all subscribers. Fire-and-forget.
    pub fn publish(&self, envelope: EventEnvelope) {
        tracing::debug!(
            event_type = envelope.payload.event_type(),
            message_id = %envelope.message_id,
            subscriber_count = self.tx.receiver_count(),
            "Event published"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive envelopes. Each subscriber gets an independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ============================================================================
// Tests
// ============================================================================
