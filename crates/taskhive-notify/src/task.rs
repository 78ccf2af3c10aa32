//! Task event consumer: assignment, completion, update, and status fan-out.

use std::sync::Arc;

use tracing::{debug, info, warn};

use taskhive_core::{
    defaults, task_body, task_link, task_route, task_subject, CreateNotificationRequest,
    EventEnvelope, MailSender, NotificationEvent, NotificationStore, Result, UserDirectory,
};

use crate::consumer::{dispatch_emails, ConsumeOutcome};
use crate::recipients::task_recipients;

/// Consumes one task-family event to completion.
///
/// Routing (type, priority, channels, link hint) comes from the policy
/// table; recipients are the event's assignees minus the acting user. An
/// empty post-exclusion set skips persistence and email entirely.
pub struct TaskEventConsumer {
    store: Arc<dyn NotificationStore>,
    users: Arc<dyn UserDirectory>,
    mailer: Arc<dyn MailSender>,
}

impl TaskEventConsumer {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        users: Arc<dyn UserDirectory>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            store,
            users,
            mailer,
        }
    }

    /// Process one task event.
    pub async fn handle(&self, envelope: &EventEnvelope) -> Result<ConsumeOutcome> {
        let Some(route) = task_route(&envelope.payload) else {
            debug!(
                subsystem = "notify",
                component = "task_consumer",
                event_type = envelope.payload.event_type(),
                "Not a task event, ignoring"
            );
            return Ok(ConsumeOutcome::Skipped);
        };

        let (task_id, assigned_user_ids) = match &envelope.payload {
            NotificationEvent::TaskCreated {
                task_id,
                assigned_user_ids,
                ..
            }
            | NotificationEvent::TaskAssigned {
                task_id,
                assigned_user_ids,
                ..
            }
            | NotificationEvent::TaskCompleted {
                task_id,
                assigned_user_ids,
                ..
            }
            | NotificationEvent::TaskUpdated {
                task_id,
                assigned_user_ids,
                ..
            }
            | NotificationEvent::TaskUnassigned {
                task_id,
                assigned_user_ids,
                ..
            }
            | NotificationEvent::StatusUpdated {
                task_id,
                assigned_user_ids,
                ..
            } => (*task_id, assigned_user_ids.as_slice()),
            _ => return Ok(ConsumeOutcome::Skipped),
        };

        // The actor never notifies themselves, whatever the event type.
        let recipients = task_recipients(assigned_user_ids, envelope.author_id);
        if recipients.is_empty() {
            debug!(
                subsystem = "notify",
                component = "task_consumer",
                message_id = %envelope.message_id,
                event_type = envelope.payload.event_type(),
                "Empty recipient set after self-exclusion, skipping"
            );
            return Ok(ConsumeOutcome::Skipped);
        }

        let actor_name = self.actor_name(envelope).await;
        let (Some(subject), Some(body)) = (
            task_subject(&envelope.payload),
            task_body(&envelope.payload, &actor_name),
        ) else {
            return Ok(ConsumeOutcome::Skipped);
        };
        let link = task_link(task_id, route.link_hint);

        let drafts: Vec<CreateNotificationRequest> = recipients
            .into_iter()
            .map(|target_id| CreateNotificationRequest {
                author_id: envelope.author_id,
                target_id,
                notification_type: route.notification_type,
                subject: subject.to_string(),
                message: body.clone(),
                channels: route.channels.to_vec(),
                priority: route.priority,
                link: Some(link.clone()),
                metadata: Some(envelope.message_id.to_string()),
            })
            .collect();

        let ids = self.store.create_bulk(drafts.clone()).await?;
        let emails = dispatch_emails(&drafts, &self.users, &self.mailer).await;

        info!(
            subsystem = "notify",
            component = "task_consumer",
            message_id = %envelope.message_id,
            event_type = envelope.payload.event_type(),
            notification_type = route.notification_type.as_str(),
            result_count = ids.len(),
            emails,
            "Task fan-out complete"
        );
        Ok(ConsumeOutcome::Delivered {
            persisted: ids.len(),
            emails,
        })
    }

    /// Display name of the acting user, only looked up when a body embeds
    /// it (status updates). Lookup failure falls back to a placeholder —
    /// never aborts the event.
    async fn actor_name(&self, envelope: &EventEnvelope) -> String {
        if !matches!(envelope.payload, NotificationEvent::StatusUpdated { .. }) {
            return String::new();
        }
        match self.users.user_profile(envelope.author_id).await {
            Ok(Some(profile)) => profile.display_name,
            Ok(None) => defaults::PLACEHOLDER_ACTOR_NAME.to_string(),
            Err(e) => {
                warn!(
                    subsystem = "notify",
                    component = "task_consumer",
                    author_id = %envelope.author_id,
                    error = %e,
                    "Actor profile lookup failed"
                );
                defaults::PLACEHOLDER_ACTOR_NAME.to_string()
            }
        }
    }
}
