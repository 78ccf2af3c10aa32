//! In-memory fakes for the storage, directory, and mail seams.
//!
//! Always compiled so consumer and pipeline tests (and downstream crates'
//! tests) can exercise fan-out logic without a database or an SMTP server.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use taskhive_core::{
    normalize_metadata, CreateNotificationRequest, Error, ListNotificationsRequest,
    ListNotificationsResponse, MailSender, Notification, NotificationStore, NotificationType,
    OutboundEmail, Result, TaskDirectory, UserDirectory, UserProfile,
};

/// In-memory [`NotificationStore`] with bulk-failure injection.
#[derive(Default)]
pub struct MemoryNotificationStore {
    rows: Mutex<Vec<Notification>>,
    bulk_calls: AtomicUsize,
    fail_next_bulk: AtomicBool,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_bulk` call fail with a storage error.
    pub fn fail_next_bulk(&self) {
        self.fail_next_bulk.store(true, Ordering::SeqCst);
    }

    /// Number of `create_bulk` invocations that reached the store.
    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored notification.
    pub fn all(&self) -> Vec<Notification> {
        self.rows.lock().expect("store lock poisoned").clone()
    }

    fn materialize(req: CreateNotificationRequest) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            author_id: req.author_id,
            target_id: req.target_id,
            notification_type: req.notification_type,
            subject: req.subject,
            message: req.message,
            channels: req.channels,
            priority: req.priority,
            link: req.link,
            metadata: normalize_metadata(req.metadata),
            read_status: false,
            read_at: None,
            dismissed_status: false,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, req: CreateNotificationRequest) -> Result<Uuid> {
        let n = Self::materialize(req);
        let id = n.id;
        self.rows.lock().expect("store lock poisoned").push(n);
        Ok(id)
    }

    async fn create_bulk(&self, reqs: Vec<CreateNotificationRequest>) -> Result<Vec<Uuid>> {
        if reqs.is_empty() {
            return Ok(Vec::new());
        }
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_bulk.swap(false, Ordering::SeqCst) {
            return Err(Error::Internal("injected bulk-create failure".into()));
        }
        let mut rows = self.rows.lock().expect("store lock poisoned");
        let mut ids = Vec::with_capacity(reqs.len());
        for req in reqs {
            let n = Self::materialize(req);
            ids.push(n.id);
            rows.push(n);
        }
        Ok(ids)
    }

    async fn fetch(&self, id: Uuid, requester: Uuid) -> Result<Notification> {
        let rows = self.rows.lock().expect("store lock poisoned");
        let n = rows
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or(Error::NotificationNotFound(id))?;
        if n.target_id != requester {
            return Err(Error::Forbidden(format!(
                "notification {} is not owned by {}",
                id, requester
            )));
        }
        Ok(n)
    }

    async fn list(&self, req: ListNotificationsRequest) -> Result<ListNotificationsResponse> {
        let rows = self.rows.lock().expect("store lock poisoned");
        let mut matched: Vec<Notification> = rows
            .iter()
            .filter(|n| n.target_id == req.target_id)
            .filter(|n| req.include_dismissed || !n.dismissed_status)
            .filter(|n| !req.unread_only || !n.read_status)
            .filter(|n| {
                req.notification_type
                    .map_or(true, |t| n.notification_type == t)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len() as i64;
        let limit = req.clamped_limit();
        let offset = req.offset.max(0);
        let page = matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(ListNotificationsResponse {
            notifications: page,
            total,
            limit,
            offset,
        })
    }

    async fn unread_count(&self, target_id: Uuid) -> Result<i64> {
        let rows = self.rows.lock().expect("store lock poisoned");
        Ok(rows
            .iter()
            .filter(|n| n.target_id == target_id && !n.read_status && !n.dismissed_status)
            .count() as i64)
    }

    async fn mark_read(&self, id: Uuid, requester: Uuid) -> Result<bool> {
        let mut rows = self.rows.lock().expect("store lock poisoned");
        let n = rows
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(Error::NotificationNotFound(id))?;
        if n.target_id != requester {
            return Err(Error::Forbidden(format!(
                "notification {} is not owned by {}",
                id, requester
            )));
        }
        if n.read_status {
            return Ok(false);
        }
        n.read_status = true;
        n.read_at = Some(Utc::now());
        Ok(true)
    }

    async fn mark_read_bulk(&self, ids: &[Uuid], requester: Uuid) -> Result<i64> {
        let wanted: HashSet<Uuid> = ids.iter().copied().collect();
        let mut rows = self.rows.lock().expect("store lock poisoned");
        let mut updated = 0;
        for n in rows
            .iter_mut()
            .filter(|n| wanted.contains(&n.id) && n.target_id == requester && !n.read_status)
        {
            n.read_status = true;
            n.read_at = Some(Utc::now());
            updated += 1;
        }
        Ok(updated)
    }

    async fn mark_all_read(&self, requester: Uuid) -> Result<i64> {
        let mut rows = self.rows.lock().expect("store lock poisoned");
        let mut updated = 0;
        for n in rows
            .iter_mut()
            .filter(|n| n.target_id == requester && !n.read_status)
        {
            n.read_status = true;
            n.read_at = Some(Utc::now());
            updated += 1;
        }
        Ok(updated)
    }

    async fn dismiss(&self, id: Uuid, requester: Uuid) -> Result<bool> {
        let mut rows = self.rows.lock().expect("store lock poisoned");
        let n = rows
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(Error::NotificationNotFound(id))?;
        if n.target_id != requester {
            return Err(Error::Forbidden(format!(
                "notification {} is not owned by {}",
                id, requester
            )));
        }
        if n.dismissed_status {
            return Ok(false);
        }
        n.dismissed_status = true;
        Ok(true)
    }

    async fn delete(&self, id: Uuid, requester: Uuid) -> Result<()> {
        let mut rows = self.rows.lock().expect("store lock poisoned");
        let idx = rows
            .iter()
            .position(|n| n.id == id)
            .ok_or(Error::NotificationNotFound(id))?;
        if rows[idx].target_id != requester {
            return Err(Error::Forbidden(format!(
                "notification {} is not owned by {}",
                id, requester
            )));
        }
        rows.remove(idx);
        Ok(())
    }

    async fn has_recent_similar(
        &self,
        author_id: Uuid,
        target_id: Uuid,
        notification_type: NotificationType,
        within_minutes: i64,
    ) -> Result<bool> {
        let cutoff = Utc::now() - Duration::minutes(within_minutes.max(0));
        let rows = self.rows.lock().expect("store lock poisoned");
        Ok(rows.iter().any(|n| {
            n.author_id == author_id
                && n.target_id == target_id
                && n.notification_type == notification_type
                && n.created_at > cutoff
        }))
    }

    async fn cleanup(&self, days_to_keep: i64) -> Result<i64> {
        let cutoff = Utc::now() - Duration::days(days_to_keep.max(0));
        let mut rows = self.rows.lock().expect("store lock poisoned");
        let before = rows.len();
        rows.retain(|n| !(n.read_status && n.created_at < cutoff));
        Ok((before - rows.len()) as i64)
    }
}

/// Static [`TaskDirectory`] built from maps.
#[derive(Default)]
pub struct StaticTaskDirectory {
    titles: HashMap<Uuid, String>,
    assignees: HashMap<Uuid, Vec<Uuid>>,
    parents: HashMap<Uuid, Uuid>,
}

impl StaticTaskDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, task_id: Uuid, title: &str, assignees: Vec<Uuid>) -> Self {
        self.titles.insert(task_id, title.to_string());
        self.assignees.insert(task_id, assignees);
        self
    }

    pub fn with_subtask(mut self, subtask_id: Uuid, parent_task_id: Uuid) -> Self {
        self.parents.insert(subtask_id, parent_task_id);
        self
    }
}

#[async_trait]
impl TaskDirectory for StaticTaskDirectory {
    async fn task_title(&self, task_id: Uuid) -> Result<Option<String>> {
        Ok(self.titles.get(&task_id).cloned())
    }

    async fn assignee_ids(&self, task_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self.assignees.get(&task_id).cloned().unwrap_or_default())
    }

    async fn parent_task_of_subtask(&self, subtask_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self.parents.get(&subtask_id).copied())
    }
}

/// Static [`UserDirectory`] with per-user lookup-failure injection.
#[derive(Default)]
pub struct StaticUserDirectory {
    profiles: HashMap<Uuid, UserProfile>,
    failing: HashSet<Uuid>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: Uuid, display_name: &str, email: Option<&str>) -> Self {
        self.profiles.insert(
            id,
            UserProfile {
                id,
                display_name: display_name.to_string(),
                email: email.map(String::from),
            },
        );
        self
    }

    /// Make lookups for `id` fail with a transient error.
    pub fn with_failing(mut self, id: Uuid) -> Self {
        self.failing.insert(id);
        self
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn user_profile(&self, id: Uuid) -> Result<Option<UserProfile>> {
        if self.failing.contains(&id) {
            return Err(Error::Internal("injected profile lookup failure".into()));
        }
        Ok(self.profiles.get(&id).cloned())
    }
}

/// [`MailSender`] that records every submission and always succeeds.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mailer lock poisoned").len()
    }
}

impl MailSender for RecordingMailer {
    fn send(&self, email: OutboundEmail) -> JoinHandle<Result<()>> {
        self.sent.lock().expect("mailer lock poisoned").push(email);
        tokio::spawn(async { Ok(()) })
    }
}
