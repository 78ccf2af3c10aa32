//! Declarative routing policy: event type → notification type, priority,
//! channel set, and link hint, plus the subject/body/link builders shared by
//! both consumers.
//!
//! Keeping the policy as lookup tables (rather than branching inside the
//! consumers) lets tests cover every row directly.

use uuid::Uuid;

use crate::events::{CommentAnchor, NotificationEvent};
use crate::models::{Channel, NotificationType, Priority};

/// Channel set used by almost every route.
pub const IN_APP_AND_EMAIL: &[Channel] = &[Channel::InApp, Channel::Email];

/// In-app only, for low-urgency records.
pub const IN_APP_ONLY: &[Channel] = &[Channel::InApp];

/// Names the UI region a deep link should focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHint {
    Assignees,
    Status,
}

impl LinkHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkHint::Assignees => "assignees",
            LinkHint::Status => "status",
        }
    }
}

// ============================================================================
// Task family
// ============================================================================

/// Routing row for one task event type.
#[derive(Debug, Clone, Copy)]
pub struct TaskRoute {
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub channels: &'static [Channel],
    pub link_hint: Option<LinkHint>,
}

/// Policy table for the task family. Returns `None` for comment events.
pub fn task_route(event: &NotificationEvent) -> Option<TaskRoute> {
    let route = match event {
        NotificationEvent::TaskCreated { .. } => TaskRoute {
            notification_type: NotificationType::TaskCreated,
            priority: Priority::Medium,
            channels: IN_APP_AND_EMAIL,
            link_hint: None,
        },
        NotificationEvent::TaskAssigned { .. } => TaskRoute {
            notification_type: NotificationType::TaskAssigned,
            priority: Priority::High,
            channels: IN_APP_AND_EMAIL,
            link_hint: Some(LinkHint::Assignees),
        },
        NotificationEvent::TaskCompleted { .. } => TaskRoute {
            notification_type: NotificationType::TaskCompleted,
            priority: Priority::Low,
            channels: IN_APP_ONLY,
            link_hint: None,
        },
        NotificationEvent::TaskUpdated { .. } => TaskRoute {
            notification_type: NotificationType::TaskUpdated,
            priority: Priority::Medium,
            channels: IN_APP_AND_EMAIL,
            link_hint: None,
        },
        NotificationEvent::TaskUnassigned { .. } => TaskRoute {
            notification_type: NotificationType::TaskUnassigned,
            priority: Priority::Medium,
            channels: IN_APP_AND_EMAIL,
            link_hint: Some(LinkHint::Assignees),
        },
        NotificationEvent::StatusUpdated { .. } => TaskRoute {
            notification_type: NotificationType::StatusUpdated,
            priority: Priority::Medium,
            channels: IN_APP_AND_EMAIL,
            link_hint: Some(LinkHint::Status),
        },
        NotificationEvent::CommentCreated { .. }
        | NotificationEvent::CommentReply { .. }
        | NotificationEvent::Mention { .. } => return None,
    };
    Some(route)
}

/// Subject line for a task event.
pub fn task_subject(event: &NotificationEvent) -> Option<&'static str> {
    let subject = match event {
        NotificationEvent::TaskCreated { .. } => "New task assigned",
        NotificationEvent::TaskAssigned { .. } => "Task assigned to you",
        NotificationEvent::TaskCompleted { .. } => "Task completed",
        NotificationEvent::TaskUpdated { .. } => "Task updated",
        NotificationEvent::TaskUnassigned { .. } => "Removed from task",
        NotificationEvent::StatusUpdated { .. } => "Task status updated",
        _ => return None,
    };
    Some(subject)
}

/// Body for a task event. `actor_name` is only consulted for status
/// updates, where the body names the editor.
pub fn task_body(event: &NotificationEvent, actor_name: &str) -> Option<String> {
    let body = match event {
        NotificationEvent::TaskCreated {
            task_title,
            task_description,
            ..
        } => {
            let desc = excerpt(task_description, 140);
            if desc.is_empty() {
                format!("You were assigned to the new task \"{}\".", task_title)
            } else {
                format!(
                    "You were assigned to the new task \"{}\": {}",
                    task_title, desc
                )
            }
        }
        NotificationEvent::TaskAssigned { task_title, .. } => {
            format!("\"{}\" was assigned to you.", task_title)
        }
        NotificationEvent::TaskCompleted { task_title, .. } => {
            format!("\"{}\" was marked as completed.", task_title)
        }
        NotificationEvent::TaskUpdated {
            task_title,
            task_status,
            ..
        } => format!("\"{}\" was updated; it is now {}.", task_title, task_status),
        NotificationEvent::TaskUnassigned { task_title, .. } => {
            format!("You were removed from \"{}\".", task_title)
        }
        NotificationEvent::StatusUpdated {
            task_title,
            task_status,
            prev_task_status,
            ..
        } => format!(
            "{} moved \"{}\" from {} to {}.",
            actor_name, task_title, prev_task_status, task_status
        ),
        _ => return None,
    };
    Some(body)
}

/// Deep link for a task event, with the route's highlight hint applied.
pub fn task_link(task_id: Uuid, hint: Option<LinkHint>) -> String {
    match hint {
        Some(hint) => format!("/tasks/{}?highlight={}", task_id, hint.as_str()),
        None => format!("/tasks/{}", task_id),
    }
}

// ============================================================================
// Comment family
// ============================================================================

/// Why a comment notification is being sent to a particular recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentReason {
    /// The recipient authored the parent comment of a reply.
    Reply,
    /// The recipient was @-mentioned.
    Mention,
    /// The recipient is assigned to the task the comment landed on.
    NewComment,
}

/// Routing row for one comment reason.
#[derive(Debug, Clone, Copy)]
pub struct CommentRoute {
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub channels: &'static [Channel],
}

/// Policy table for the comment family, keyed by recipient reason.
pub fn comment_route(reason: CommentReason) -> CommentRoute {
    match reason {
        CommentReason::Reply => CommentRoute {
            notification_type: NotificationType::CommentReply,
            priority: Priority::Medium,
            channels: IN_APP_AND_EMAIL,
        },
        CommentReason::Mention => CommentRoute {
            notification_type: NotificationType::Mention,
            priority: Priority::High,
            channels: IN_APP_AND_EMAIL,
        },
        CommentReason::NewComment => CommentRoute {
            notification_type: NotificationType::CommentReply,
            priority: Priority::Medium,
            channels: IN_APP_AND_EMAIL,
        },
    }
}

/// Subject line for a comment notification.
pub fn comment_subject(reason: CommentReason) -> &'static str {
    match reason {
        CommentReason::Reply => "New reply to your comment",
        CommentReason::Mention => "You were mentioned",
        CommentReason::NewComment => "New comment",
    }
}

/// Body for a comment notification.
pub fn comment_body(reason: CommentReason, task_title: &str, content: &str) -> String {
    let snippet = excerpt(content, 140);
    match reason {
        CommentReason::Reply => format!(
            "Someone replied to your comment on \"{}\": {}",
            task_title, snippet
        ),
        CommentReason::Mention => format!(
            "You were mentioned in a comment on \"{}\": {}",
            task_title, snippet
        ),
        CommentReason::NewComment => {
            format!("A new comment was posted on \"{}\": {}", task_title, snippet)
        }
    }
}

/// Deep link to a comment. Subtask anchors link through the parent task
/// when it could be resolved; otherwise they fall back to the subtask page.
pub fn comment_link(anchor: &CommentAnchor, parent_task_id: Option<Uuid>, comment_id: Uuid) -> String {
    match anchor {
        CommentAnchor::Task(task_id) => format!("/tasks/{}?comment={}", task_id, comment_id),
        CommentAnchor::Subtask(subtask_id) => match parent_task_id {
            Some(task_id) => format!(
                "/tasks/{}?subtask={}&comment={}",
                task_id, subtask_id, comment_id
            ),
            None => format!("/subtasks/{}?comment={}", subtask_id, comment_id),
        },
    }
}

/// First `max_chars` characters of `content`, whitespace collapsed, with an
/// ellipsis when truncated.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(max_chars).collect();
    format!("{}…", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_event(kind: &str) -> NotificationEvent {
        let task_id = Uuid::nil();
        let project_id = Uuid::nil();
        let title = "Ship the release".to_string();
        match kind {
            "created" => NotificationEvent::TaskCreated {
                task_id,
                project_id,
                task_title: title,
                task_description: "Cut the final build".to_string(),
                assigned_user_ids: vec![],
            },
            "assigned" => NotificationEvent::TaskAssigned {
                task_id,
                project_id,
                task_title: title,
                assigned_user_ids: vec![],
            },
            "completed" => NotificationEvent::TaskCompleted {
                task_id,
                project_id,
                task_title: title,
                assigned_user_ids: vec![],
            },
            "updated" => NotificationEvent::TaskUpdated {
                task_id,
                project_id,
                task_title: title,
                task_status: "in_review".to_string(),
                assigned_user_ids: vec![],
            },
            "unassigned" => NotificationEvent::TaskUnassigned {
                task_id,
                project_id,
                task_title: title,
                assigned_user_ids: vec![],
            },
            "status" => NotificationEvent::StatusUpdated {
                task_id,
                project_id,
                task_title: title,
                task_status: "done".to_string(),
                prev_task_status: "in_review".to_string(),
                assigned_user_ids: vec![],
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_task_route_table_every_row() {
        let rows = [
            ("created", NotificationType::TaskCreated, Priority::Medium, 2, None),
            (
                "assigned",
                NotificationType::TaskAssigned,
                Priority::High,
                2,
                Some(LinkHint::Assignees),
            ),
            ("completed", NotificationType::TaskCompleted, Priority::Low, 1, None),
            ("updated", NotificationType::TaskUpdated, Priority::Medium, 2, None),
            (
                "unassigned",
                NotificationType::TaskUnassigned,
                Priority::Medium,
                2,
                Some(LinkHint::Assignees),
            ),
            (
                "status",
                NotificationType::StatusUpdated,
                Priority::Medium,
                2,
                Some(LinkHint::Status),
            ),
        ];

        for (kind, expected_type, expected_priority, channel_count, hint) in rows {
            let event = task_event(kind);
            let route = task_route(&event).unwrap();
            assert_eq!(route.notification_type, expected_type, "{kind}");
            assert_eq!(route.priority, expected_priority, "{kind}");
            assert_eq!(route.channels.len(), channel_count, "{kind}");
            assert!(route.channels.contains(&Channel::InApp), "{kind}");
            assert_eq!(
                route.channels.contains(&Channel::Email),
                channel_count == 2,
                "{kind}"
            );
            assert_eq!(route.link_hint, hint, "{kind}");
        }
    }

    #[test]
    fn test_task_route_none_for_comment_events() {
        let event = NotificationEvent::Mention {
            comment_id: Uuid::nil(),
            anchor: CommentAnchor::Task(Uuid::nil()),
            content: String::new(),
            task_title: String::new(),
            mentioned_user_ids: vec![],
        };
        assert!(task_route(&event).is_none());
        assert!(task_subject(&event).is_none());
        assert!(task_body(&event, "x").is_none());
    }

    #[test]
    fn test_task_subjects() {
        assert_eq!(task_subject(&task_event("created")), Some("New task assigned"));
        assert_eq!(
            task_subject(&task_event("assigned")),
            Some("Task assigned to you")
        );
        assert_eq!(task_subject(&task_event("completed")), Some("Task completed"));
        assert_eq!(task_subject(&task_event("updated")), Some("Task updated"));
        assert_eq!(
            task_subject(&task_event("unassigned")),
            Some("Removed from task")
        );
        assert_eq!(
            task_subject(&task_event("status")),
            Some("Task status updated")
        );
    }

    #[test]
    fn test_task_updated_body_names_new_status() {
        let body = task_body(&task_event("updated"), "ignored").unwrap();
        assert!(body.contains("in_review"));
        assert!(body.contains("Ship the release"));
    }

    #[test]
    fn test_status_body_names_editor_and_both_statuses() {
        let body = task_body(&task_event("status"), "Priya").unwrap();
        assert!(body.starts_with("Priya "));
        assert!(body.contains("in_review"));
        assert!(body.contains("done"));
    }

    #[test]
    fn test_task_link_hints() {
        let id = Uuid::nil();
        assert_eq!(task_link(id, None), format!("/tasks/{}", id));
        assert_eq!(
            task_link(id, Some(LinkHint::Assignees)),
            format!("/tasks/{}?highlight=assignees", id)
        );
        assert_eq!(
            task_link(id, Some(LinkHint::Status)),
            format!("/tasks/{}?highlight=status", id)
        );
    }

    #[test]
    fn test_comment_route_table() {
        let reply = comment_route(CommentReason::Reply);
        assert_eq!(reply.notification_type, NotificationType::CommentReply);
        assert_eq!(reply.priority, Priority::Medium);
        assert_eq!(reply.channels, IN_APP_AND_EMAIL);

        let mention = comment_route(CommentReason::Mention);
        assert_eq!(mention.notification_type, NotificationType::Mention);
        assert_eq!(mention.priority, Priority::High);
        assert_eq!(mention.channels, IN_APP_AND_EMAIL);

        let new_comment = comment_route(CommentReason::NewComment);
        assert_eq!(new_comment.notification_type, NotificationType::CommentReply);
        assert_eq!(new_comment.priority, Priority::Medium);
        assert_eq!(new_comment.channels, IN_APP_AND_EMAIL);
    }

    #[test]
    fn test_comment_link_shapes() {
        let task = Uuid::new_v4();
        let subtask = Uuid::new_v4();
        let comment = Uuid::new_v4();

        assert_eq!(
            comment_link(&CommentAnchor::Task(task), Some(task), comment),
            format!("/tasks/{}?comment={}", task, comment)
        );
        assert_eq!(
            comment_link(&CommentAnchor::Subtask(subtask), Some(task), comment),
            format!("/tasks/{}?subtask={}&comment={}", task, subtask, comment)
        );
        assert_eq!(
            comment_link(&CommentAnchor::Subtask(subtask), None, comment),
            format!("/subtasks/{}?comment={}", subtask, comment)
        );
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 140), "short");
        assert_eq!(excerpt("  a\n\n b\tc ", 140), "a b c");

        let long = "x".repeat(200);
        let cut = excerpt(&long, 140);
        assert_eq!(cut.chars().count(), 141); // 140 + ellipsis
        assert!(cut.ends_with('…'));
    }
}
