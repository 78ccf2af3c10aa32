//! Comment event consumer: replies, mentions, and new-comment fan-out.

use std::sync::Arc;

use tracing::{debug, info, warn};

use taskhive_core::{
    defaults, CommentAnchor, EventEnvelope, MailSender, NotificationEvent, NotificationStore,
    Result, TaskDirectory, UserDirectory,
};

use crate::consumer::{dispatch_emails, ConsumeOutcome};
use crate::recipients::{comment_drafts, CommentContext};

/// Consumes one comment-family event to completion: resolve task context,
/// build per-(recipient, reason) drafts, persist them in one bulk call,
/// then trigger best-effort email per record.
///
/// Lookup failures degrade to placeholders; only the bulk persist
/// propagates an error (the transport's retry/dead-letter seam).
pub struct CommentEventConsumer {
    store: Arc<dyn NotificationStore>,
    tasks: Arc<dyn TaskDirectory>,
    users: Arc<dyn UserDirectory>,
    mailer: Arc<dyn MailSender>,
}

impl CommentEventConsumer {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        tasks: Arc<dyn TaskDirectory>,
        users: Arc<dyn UserDirectory>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            store,
            tasks,
            users,
            mailer,
        }
    }

    /// Process one comment event.
    pub async fn handle(&self, envelope: &EventEnvelope) -> Result<ConsumeOutcome> {
        let (anchor, snapshot_title, mentions_empty) = match &envelope.payload {
            NotificationEvent::CommentCreated {
                anchor,
                task_title,
                mentioned_user_ids,
                ..
            }
            | NotificationEvent::Mention {
                anchor,
                task_title,
                mentioned_user_ids,
                ..
            } => (anchor, task_title, mentioned_user_ids.is_empty()),
            NotificationEvent::CommentReply {
                anchor, task_title, ..
            } => (anchor, task_title, true),
            _ => {
                debug!(
                    subsystem = "notify",
                    component = "comment_consumer",
                    event_type = envelope.payload.event_type(),
                    "Not a comment event, ignoring"
                );
                return Ok(ConsumeOutcome::Skipped);
            }
        };

        let ctx = self.resolve_context(anchor, snapshot_title).await;

        // No one watching the task and no one mentioned: nothing to do.
        if ctx.assignee_ids.is_empty() && mentions_empty {
            debug!(
                subsystem = "notify",
                component = "comment_consumer",
                message_id = %envelope.message_id,
                "No assignees and no mentions, skipping"
            );
            return Ok(ConsumeOutcome::Skipped);
        }

        let drafts = comment_drafts(envelope, &ctx);
        if drafts.is_empty() {
            return Ok(ConsumeOutcome::Skipped);
        }

        let ids = self.store.create_bulk(drafts.clone()).await?;
        let emails = dispatch_emails(&drafts, &self.users, &self.mailer).await;

        info!(
            subsystem = "notify",
            component = "comment_consumer",
            message_id = %envelope.message_id,
            event_type = envelope.payload.event_type(),
            result_count = ids.len(),
            emails,
            "Comment fan-out complete"
        );
        Ok(ConsumeOutcome::Delivered {
            persisted: ids.len(),
            emails,
        })
    }

    /// Resolve the anchor's parent task, title, and assignee set.
    ///
    /// Every lookup failure here is transient: logged and treated as a
    /// missing entity rather than aborting the event.
    async fn resolve_context(&self, anchor: &CommentAnchor, snapshot_title: &str) -> CommentContext {
        let task_id = match anchor {
            CommentAnchor::Task(id) => Some(*id),
            CommentAnchor::Subtask(subtask_id) => {
                match self.tasks.parent_task_of_subtask(*subtask_id).await {
                    Ok(parent) => parent,
                    Err(e) => {
                        warn!(
                            subsystem = "notify",
                            component = "comment_consumer",
                            error = %e,
                            "Subtask parent lookup failed"
                        );
                        None
                    }
                }
            }
        };

        let task_title = match task_id {
            Some(id) => match self.tasks.task_title(id).await {
                Ok(Some(title)) => title,
                Ok(None) => fallback_title(snapshot_title),
                Err(e) => {
                    warn!(
                        subsystem = "notify",
                        component = "comment_consumer",
                        error = %e,
                        "Task title lookup failed"
                    );
                    fallback_title(snapshot_title)
                }
            },
            None => fallback_title(snapshot_title),
        };

        let assignee_ids = match task_id {
            Some(id) => match self.tasks.assignee_ids(id).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(
                        subsystem = "notify",
                        component = "comment_consumer",
                        error = %e,
                        "Assignee lookup failed"
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        CommentContext {
            task_id,
            task_title,
            assignee_ids,
        }
    }
}

fn fallback_title(snapshot: &str) -> String {
    if snapshot.trim().is_empty() {
        defaults::PLACEHOLDER_TASK_TITLE.to_string()
    } else {
        snapshot.to_string()
    }
}
