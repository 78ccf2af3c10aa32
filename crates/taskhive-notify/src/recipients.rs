//! Recipient resolution: turning an event into (recipient, reason) drafts.
//!
//! Kept pure — no I/O — so the fan-out counting rules are directly
//! unit-testable. The consumers resolve task context first and feed it in.

use std::collections::HashSet;

use uuid::Uuid;

use taskhive_core::{
    comment_body, comment_link, comment_route, comment_subject, CommentAnchor, CommentReason,
    CreateNotificationRequest, EventEnvelope, NotificationEvent,
};

/// Task context resolved by the comment consumer before draft building.
#[derive(Debug, Clone)]
pub struct CommentContext {
    /// Parent task of the comment's anchor, when it could be resolved.
    pub task_id: Option<Uuid>,
    /// Resolved title (lookup → payload snapshot → placeholder).
    pub task_title: String,
    /// Current assignees of the resolved task.
    pub assignee_ids: Vec<Uuid>,
}

/// Build one notification draft per (recipient, reason) pair for a
/// comment-family event.
///
/// - `COMMENT_REPLY` → the parent comment's author only.
/// - `MENTION` → each mentioned user.
/// - `COMMENT_CREATED` → each mentioned user **and** each assignee; a user
///   who is both mentioned and assigned gets two drafts, one per cause.
///
/// The event's author never receives a draft. Returns an empty vec for
/// task-family payloads.
pub fn comment_drafts(
    envelope: &EventEnvelope,
    ctx: &CommentContext,
) -> Vec<CreateNotificationRequest> {
    let author = envelope.author_id;

    match &envelope.payload {
        NotificationEvent::CommentReply {
            comment_id,
            anchor,
            content,
            parent_comment_author_id,
            ..
        } => std::iter::once(*parent_comment_author_id)
            .filter(|target| *target != author)
            .map(|target| {
                comment_draft(
                    envelope,
                    target,
                    CommentReason::Reply,
                    ctx,
                    *comment_id,
                    anchor,
                    content,
                )
            })
            .collect(),
        NotificationEvent::Mention {
            comment_id,
            anchor,
            content,
            mentioned_user_ids,
            ..
        } => dedup(mentioned_user_ids)
            .into_iter()
            .filter(|target| *target != author)
            .map(|target| {
                comment_draft(
                    envelope,
                    target,
                    CommentReason::Mention,
                    ctx,
                    *comment_id,
                    anchor,
                    content,
                )
            })
            .collect(),
        NotificationEvent::CommentCreated {
            comment_id,
            anchor,
            content,
            mentioned_user_ids,
            ..
        } => {
            let mut drafts = Vec::new();
            for target in dedup(mentioned_user_ids) {
                if target == author {
                    continue;
                }
                drafts.push(comment_draft(
                    envelope,
                    target,
                    CommentReason::Mention,
                    ctx,
                    *comment_id,
                    anchor,
                    content,
                ));
            }
            for target in dedup(&ctx.assignee_ids) {
                if target == author {
                    continue;
                }
                drafts.push(comment_draft(
                    envelope,
                    target,
                    CommentReason::NewComment,
                    ctx,
                    *comment_id,
                    anchor,
                    content,
                ));
            }
            drafts
        }
        _ => Vec::new(),
    }
}

/// Recipients of a task-family event: the assigned users, deduplicated,
/// with the acting user excluded.
pub fn task_recipients(assigned_user_ids: &[Uuid], author_id: Uuid) -> Vec<Uuid> {
    dedup(assigned_user_ids)
        .into_iter()
        .filter(|id| *id != author_id)
        .collect()
}

fn comment_draft(
    envelope: &EventEnvelope,
    target: Uuid,
    reason: CommentReason,
    ctx: &CommentContext,
    comment_id: Uuid,
    anchor: &CommentAnchor,
    content: &str,
) -> CreateNotificationRequest {
    let route = comment_route(reason);
    CreateNotificationRequest {
        author_id: envelope.author_id,
        target_id: target,
        notification_type: route.notification_type,
        subject: comment_subject(reason).to_string(),
        message: comment_body(reason, &ctx.task_title, content),
        channels: route.channels.to_vec(),
        priority: route.priority,
        link: Some(comment_link(anchor, ctx.task_id, comment_id)),
        metadata: Some(envelope.message_id.to_string()),
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskhive_core::{Channel, CommentAnchor, NotificationType, Priority};

    fn ctx(task_id: Uuid, assignees: Vec<Uuid>) -> CommentContext {
        CommentContext {
            task_id: Some(task_id),
            task_title: "Ship the release".to_string(),
            assignee_ids: assignees,
        }
    }

    fn created_envelope(
        author: Uuid,
        task_id: Uuid,
        mentioned: Vec<Uuid>,
    ) -> EventEnvelope {
        EventEnvelope::new(
            author,
            NotificationEvent::CommentCreated {
                comment_id: Uuid::new_v4(),
                anchor: CommentAnchor::Task(task_id),
                content: "please take a look".to_string(),
                task_title: "Ship the release".to_string(),
                mentioned_user_ids: mentioned,
            },
        )
    }

    #[test]
    fn test_created_fanout_counts_assignees_plus_mentions() {
        let author = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let d = Uuid::new_v4();

        // Mentions [a, b], assignees {a, b, d}: 2 mention + 3 new-comment drafts
        let envelope = created_envelope(author, task_id, vec![a, b]);
        let drafts = comment_drafts(&envelope, &ctx(task_id, vec![a, b, d]));

        assert_eq!(drafts.len(), 5);
        let mentions: Vec<_> = drafts
            .iter()
            .filter(|d| d.notification_type == NotificationType::Mention)
            .collect();
        let comments: Vec<_> = drafts
            .iter()
            .filter(|d| d.notification_type == NotificationType::CommentReply)
            .collect();
        assert_eq!(mentions.len(), 2);
        assert_eq!(comments.len(), 3);

        for m in &mentions {
            assert_eq!(m.priority, Priority::High);
        }
        for c in &comments {
            assert_eq!(c.priority, Priority::Medium);
        }

        // A user both mentioned and assigned gets one draft per cause
        let for_a: Vec<_> = drafts.iter().filter(|d| d.target_id == a).collect();
        assert_eq!(for_a.len(), 2);
    }

    #[test]
    fn test_created_excludes_author_from_both_reasons() {
        let author = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let other = Uuid::new_v4();

        // Author is mentioned and assigned; only `other` is notified
        let envelope = created_envelope(author, task_id, vec![author, other]);
        let drafts = comment_drafts(&envelope, &ctx(task_id, vec![author, other]));

        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|d| d.target_id == other));
        assert!(drafts.iter().all(|d| d.author_id == author));
    }

    #[test]
    fn test_created_no_mentions_notifies_assignees_only() {
        let author = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let envelope = created_envelope(author, task_id, vec![]);
        let drafts = comment_drafts(&envelope, &ctx(task_id, vec![a, b]));

        assert_eq!(drafts.len(), 2);
        for d in &drafts {
            assert_eq!(d.notification_type, NotificationType::CommentReply);
            assert_eq!(d.priority, Priority::Medium);
            assert_eq!(d.channels, vec![Channel::InApp, Channel::Email]);
        }
        let targets: Vec<Uuid> = drafts.iter().map(|d| d.target_id).collect();
        assert!(targets.contains(&a) && targets.contains(&b));
    }

    #[test]
    fn test_reply_targets_parent_author_only() {
        let author = Uuid::new_v4();
        let parent_author = Uuid::new_v4();
        let task_id = Uuid::new_v4();

        let envelope = EventEnvelope::new(
            author,
            NotificationEvent::CommentReply {
                comment_id: Uuid::new_v4(),
                anchor: CommentAnchor::Task(task_id),
                content: "agreed".to_string(),
                task_title: "Ship the release".to_string(),
                parent_comment_author_id: parent_author,
            },
        );
        let drafts = comment_drafts(&envelope, &ctx(task_id, vec![Uuid::new_v4()]));

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].target_id, parent_author);
        assert_eq!(drafts[0].notification_type, NotificationType::CommentReply);
        assert_eq!(drafts[0].priority, Priority::Medium);
    }

    #[test]
    fn test_reply_to_own_comment_produces_nothing() {
        let author = Uuid::new_v4();
        let task_id = Uuid::new_v4();

        let envelope = EventEnvelope::new(
            author,
            NotificationEvent::CommentReply {
                comment_id: Uuid::new_v4(),
                anchor: CommentAnchor::Task(task_id),
                content: "self reply".to_string(),
                task_title: "Ship the release".to_string(),
                parent_comment_author_id: author,
            },
        );
        assert!(comment_drafts(&envelope, &ctx(task_id, vec![])).is_empty());
    }

    #[test]
    fn test_mention_event_drafts() {
        let author = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let envelope = EventEnvelope::new(
            author,
            NotificationEvent::Mention {
                comment_id: Uuid::new_v4(),
                anchor: CommentAnchor::Task(task_id),
                content: "updated the doc".to_string(),
                task_title: "Ship the release".to_string(),
                // Duplicate mention collapses to one draft
                mentioned_user_ids: vec![a, b, a],
            },
        );
        let drafts = comment_drafts(&envelope, &ctx(task_id, vec![Uuid::new_v4()]));

        assert_eq!(drafts.len(), 2);
        for d in &drafts {
            assert_eq!(d.notification_type, NotificationType::Mention);
            assert_eq!(d.priority, Priority::High);
        }
    }

    #[test]
    fn test_drafts_carry_link_and_trace_metadata() {
        let author = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let a = Uuid::new_v4();

        let envelope = created_envelope(author, task_id, vec![a]);
        let drafts = comment_drafts(&envelope, &ctx(task_id, vec![]));

        assert_eq!(drafts.len(), 1);
        let link = drafts[0].link.as_deref().unwrap();
        assert!(link.starts_with(&format!("/tasks/{}", task_id)));
        assert_eq!(
            drafts[0].metadata.as_deref(),
            Some(envelope.message_id.to_string().as_str())
        );
        assert!(drafts[0].message.contains("Ship the release"));
    }

    #[test]
    fn test_task_family_payload_yields_no_comment_drafts() {
        let envelope = EventEnvelope::new(
            Uuid::new_v4(),
            NotificationEvent::TaskCompleted {
                task_id: Uuid::new_v4(),
                project_id: Uuid::new_v4(),
                task_title: "Ship the release".to_string(),
                assigned_user_ids: vec![Uuid::new_v4()],
            },
        );
        assert!(comment_drafts(&envelope, &ctx(Uuid::new_v4(), vec![])).is_empty());
    }

    #[test]
    fn test_task_recipients_excludes_author_and_dedupes() {
        let author = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(task_recipients(&[a, author, b, a], author), vec![a, b]);
        assert!(task_recipients(&[author], author).is_empty());
        assert!(task_recipients(&[], author).is_empty());
    }
}
