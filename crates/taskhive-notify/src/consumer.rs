//! Shared consumer plumbing: the outcome type and the per-recipient email
//! fan-out with isolated failures.

use std::sync::Arc;

use tracing::{debug, warn};

use taskhive_core::{CreateNotificationRequest, MailSender, UserDirectory};
use taskhive_mailer::render;

/// Result of consuming one event to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Notifications were persisted; email fan-out was triggered.
    Delivered {
        /// Records written by the bulk create.
        persisted: usize,
        /// Email submissions attempted (recipients with a usable address).
        emails: usize,
    },
    /// Empty recipient set after resolution and self-exclusion; nothing
    /// was persisted and no email was sent. Not an error.
    Skipped,
}

/// Submit at most one email per recipient across the batch, for drafts
/// whose channel set includes email.
///
/// A recipient holding several records from the same event (mentioned and
/// assigned, say) gets a single message — the first draft wins, and mention
/// drafts are built first. Profile-lookup failures and missing/blank
/// addresses skip that one recipient; the rest of the batch proceeds.
/// Returns the number of submissions handed to the mailer — delivery
/// itself is fire-and-forget.
pub(crate) async fn dispatch_emails(
    drafts: &[CreateNotificationRequest],
    users: &Arc<dyn UserDirectory>,
    mailer: &Arc<dyn MailSender>,
) -> usize {
    let mut attempted = 0;
    let mut emailed = std::collections::HashSet::new();

    for draft in drafts.iter().filter(|d| d.wants_email()) {
        if !emailed.insert(draft.target_id) {
            continue;
        }
        let profile = match users.user_profile(draft.target_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                debug!(
                    subsystem = "notify",
                    target_id = %draft.target_id,
                    "No profile for recipient, skipping email"
                );
                continue;
            }
            Err(e) => {
                warn!(
                    subsystem = "notify",
                    target_id = %draft.target_id,
                    error = %e,
                    "Profile lookup failed, skipping email for this recipient"
                );
                continue;
            }
        };

        let Some(address) = profile.deliverable_email() else {
            debug!(
                subsystem = "notify",
                target_id = %draft.target_id,
                "Recipient has no email address, skipping"
            );
            continue;
        };

        let email = render::notification_email(
            address,
            &draft.subject,
            &draft.message,
            draft.link.as_deref(),
        );
        // Delivery outcome is observable via the handle and the mailer's
        // own logs; the consumer does not await it.
        let _ = mailer.send(email);
        attempted += 1;
    }

    attempted
}
