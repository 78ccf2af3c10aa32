//! Notification repository: recipient-scoped persistence and queries.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use taskhive_core::{
    normalize_metadata, Channel, CreateNotificationRequest, Error, ListNotificationsRequest,
    ListNotificationsResponse, Notification, NotificationStore, NotificationType, Priority, Result,
};

const NOTIFICATION_COLUMNS: &str = "id, author_id, target_id, notification_type, subject, \
     message, channels, priority, link, metadata, read_status, read_at, dismissed_status, \
     created_at";

/// PostgreSQL implementation of [`NotificationStore`].
pub struct PgNotificationRepository {
    pool: Pool<Postgres>,
}

impl PgNotificationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert notification type string from the database.
    fn str_to_notification_type(s: &str) -> NotificationType {
        match s {
            "task_created" => NotificationType::TaskCreated,
            "task_assigned" => NotificationType::TaskAssigned,
            "task_completed" => NotificationType::TaskCompleted,
            "task_updated" => NotificationType::TaskUpdated,
            "task_unassigned" => NotificationType::TaskUnassigned,
            "status_updated" => NotificationType::StatusUpdated,
            "comment_reply" => NotificationType::CommentReply,
            "mention" => NotificationType::Mention,
            _ => NotificationType::TaskUpdated, // fallback
        }
    }

    /// Convert priority string from the database.
    fn str_to_priority(s: &str) -> Priority {
        match s {
            "low" => Priority::Low,
            "high" => Priority::High,
            _ => Priority::Medium,
        }
    }

    /// Convert channel string from the database. Unknown channels are
    /// dropped on read (forward compatibility with new delivery media).
    fn str_to_channel(s: &str) -> Option<Channel> {
        match s {
            "in_app" => Some(Channel::InApp),
            "email" => Some(Channel::Email),
            _ => None,
        }
    }

    fn channels_to_strings(channels: &[Channel]) -> Vec<String> {
        channels.iter().map(|c| c.as_str().to_string()).collect()
    }

    fn parse_row(r: &sqlx::postgres::PgRow) -> Notification {
        let channel_strs: Vec<String> = r.get("channels");
        let type_str: String = r.get("notification_type");
        let priority_str: String = r.get("priority");
        Notification {
            id: r.get("id"),
            author_id: r.get("author_id"),
            target_id: r.get("target_id"),
            notification_type: Self::str_to_notification_type(&type_str),
            subject: r.get("subject"),
            message: r.get("message"),
            channels: channel_strs
                .iter()
                .filter_map(|c| Self::str_to_channel(c))
                .collect(),
            priority: Self::str_to_priority(&priority_str),
            link: r.get("link"),
            metadata: r.get("metadata"),
            read_status: r.get("read_status"),
            read_at: r.get("read_at"),
            dismissed_status: r.get("dismissed_status"),
            created_at: r.get("created_at"),
        }
    }

    async fn insert_one(
        tx: &mut Transaction<'_, Postgres>,
        req: CreateNotificationRequest,
    ) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let metadata = normalize_metadata(req.metadata);
        let channels = Self::channels_to_strings(&req.channels);
        sqlx::query(
            "INSERT INTO notification (id, author_id, target_id, notification_type, subject, \
             message, channels, priority, link, metadata, read_status, dismissed_status, \
             created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false, false, $11)",
        )
        .bind(id)
        .bind(req.author_id)
        .bind(req.target_id)
        .bind(req.notification_type.as_str())
        .bind(&req.subject)
        .bind(&req.message)
        .bind(&channels)
        .bind(req.priority.as_str())
        .bind(&req.link)
        .bind(&metadata)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }

    /// Fetch the ownership/flag columns for a single notification.
    async fn fetch_owner_row(&self, id: Uuid) -> Result<(Uuid, bool, bool)> {
        let row = sqlx::query(
            "SELECT target_id, read_status, dismissed_status FROM notification WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NotificationNotFound(id))?;

        Ok((
            row.get("target_id"),
            row.get("read_status"),
            row.get("dismissed_status"),
        ))
    }

    fn ensure_owner(id: Uuid, target_id: Uuid, requester: Uuid) -> Result<()> {
        if target_id != requester {
            return Err(Error::Forbidden(format!(
                "notification {} is not owned by {}",
                id, requester
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PgNotificationRepository {
    async fn create(&self, req: CreateNotificationRequest) -> Result<Uuid> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let id = Self::insert_one(&mut tx, req).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(id)
    }

    async fn create_bulk(&self, reqs: Vec<CreateNotificationRequest>) -> Result<Vec<Uuid>> {
        if reqs.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut ids = Vec::with_capacity(reqs.len());
        for req in reqs {
            ids.push(Self::insert_one(&mut tx, req).await?);
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(ids)
    }

    async fn fetch(&self, id: Uuid, requester: Uuid) -> Result<Notification> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM notification WHERE id = $1",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NotificationNotFound(id))?;

        let notification = Self::parse_row(&row);
        Self::ensure_owner(id, notification.target_id, requester)?;
        Ok(notification)
    }

    async fn list(&self, req: ListNotificationsRequest) -> Result<ListNotificationsResponse> {
        let limit = req.clamped_limit();
        let offset = req.offset.max(0);

        let mut where_clause = String::from("WHERE target_id = $1");
        if !req.include_dismissed {
            where_clause.push_str(" AND dismissed_status = false");
        }
        if req.unread_only {
            where_clause.push_str(" AND read_status = false");
        }
        let mut param_idx = 2;
        let type_str = req.notification_type.map(|t| t.as_str());
        if type_str.is_some() {
            where_clause.push_str(&format!(" AND notification_type = ${}", param_idx));
            param_idx += 1;
        }

        let count_sql = format!("SELECT COUNT(*) AS total FROM notification {}", where_clause);
        let mut count_query = sqlx::query(&count_sql).bind(req.target_id);
        if let Some(t) = type_str {
            count_query = count_query.bind(t);
        }
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .get("total");

        let page_sql = format!(
            "SELECT {} FROM notification {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            NOTIFICATION_COLUMNS,
            where_clause,
            param_idx,
            param_idx + 1
        );
        let mut page_query = sqlx::query(&page_sql).bind(req.target_id);
        if let Some(t) = type_str {
            page_query = page_query.bind(t);
        }
        let rows = page_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(ListNotificationsResponse {
            notifications: rows.iter().map(Self::parse_row).collect(),
            total,
            limit,
            offset,
        })
    }

    async fn unread_count(&self, target_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM notification
             WHERE target_id = $1 AND read_status = false AND dismissed_status = false",
        )
        .bind(target_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("total"))
    }

    async fn mark_read(&self, id: Uuid, requester: Uuid) -> Result<bool> {
        let (target_id, read_status, _) = self.fetch_owner_row(id).await?;
        Self::ensure_owner(id, target_id, requester)?;
        if read_status {
            return Ok(false);
        }

        sqlx::query("UPDATE notification SET read_status = true, read_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(true)
    }

    async fn mark_read_bulk(&self, ids: &[Uuid], requester: Uuid) -> Result<i64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE notification SET read_status = true, read_at = $1
             WHERE id = ANY($2) AND target_id = $3 AND read_status = false",
        )
        .bind(Utc::now())
        .bind(ids)
        .bind(requester)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() as i64)
    }

    async fn mark_all_read(&self, requester: Uuid) -> Result<i64> {
        let result = sqlx::query(
            "UPDATE notification SET read_status = true, read_at = $1
             WHERE target_id = $2 AND read_status = false",
        )
        .bind(Utc::now())
        .bind(requester)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() as i64)
    }

    async fn dismiss(&self, id: Uuid, requester: Uuid) -> Result<bool> {
        let (target_id, _, dismissed_status) = self.fetch_owner_row(id).await?;
        Self::ensure_owner(id, target_id, requester)?;
        if dismissed_status {
            return Ok(false);
        }

        sqlx::query("UPDATE notification SET dismissed_status = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(true)
    }

    async fn delete(&self, id: Uuid, requester: Uuid) -> Result<()> {
        let (target_id, _, _) = self.fetch_owner_row(id).await?;
        Self::ensure_owner(id, target_id, requester)?;

        sqlx::query("DELETE FROM notification WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
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
        let row = sqlx::query(
            "SELECT EXISTS(
                 SELECT 1 FROM notification
                 WHERE author_id = $1 AND target_id = $2
                   AND notification_type = $3 AND created_at > $4
             ) AS present",
        )
        .bind(author_id)
        .bind(target_id)
        .bind(notification_type.as_str())
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("present"))
    }

    async fn cleanup(&self, days_to_keep: i64) -> Result<i64> {
        let cutoff = Utc::now() - Duration::days(days_to_keep.max(0));
        let result =
            sqlx::query("DELETE FROM notification WHERE read_status = true AND created_at < $1")
                .bind(cutoff)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;

        let removed = result.rows_affected() as i64;
        tracing::info!(
            subsystem = "db",
            component = "notifications",
            op = "cleanup",
            days_to_keep,
            result_count = removed,
            "Retention cleanup complete"
        );
        Ok(removed)
    }
}
