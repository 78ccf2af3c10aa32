//! Task directory: read-only lookups against the task tables owned by the
//! wider backend. Missing entities resolve to `None`/empty, never errors.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use taskhive_core::{Error, Result, TaskDirectory};

/// PostgreSQL implementation of [`TaskDirectory`].
pub struct PgTaskDirectory {
    pool: Pool<Postgres>,
}

impl PgTaskDirectory {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskDirectory for PgTaskDirectory {
    async fn task_title(&self, task_id: Uuid) -> Result<Option<String>> {
        let row = sqlx::query("SELECT title FROM task WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| r.get("title")))
    }

    async fn assignee_ids(&self, task_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT user_id FROM task_assignee WHERE task_id = $1 ORDER BY assigned_at",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(|r| r.get("user_id")).collect())
    }

    async fn parent_task_of_subtask(&self, subtask_id: Uuid) -> Result<Option<Uuid>> {
        let row = sqlx::query("SELECT task_id FROM subtask WHERE id = $1")
            .bind(subtask_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| r.get("task_id")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::DEFAULT_TEST_DATABASE_URL;

    async fn setup() -> PgTaskDirectory {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_TEST_DATABASE_URL.to_string());
        let pool = crate::create_pool(&database_url)
            .await
            .expect("Failed to connect to test DB");
        PgTaskDirectory::new(pool)
    }

    async fn insert_task(dir: &PgTaskDirectory, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO task (id, project_id, title, description, status) \
             VALUES ($1, $2, $3, '', 'open')",
        )
        .bind(id)
        .bind(Uuid::new_v4())
        .bind(title)
        .execute(&dir.pool)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_task_title_and_missing() {
        let dir = setup().await;
        let task_id = insert_task(&dir, "Ship the release").await;

        assert_eq!(
            dir.task_title(task_id).await.unwrap().as_deref(),
            Some("Ship the release")
        );
        assert_eq!(dir.task_title(Uuid::new_v4()).await.unwrap(), None);

        sqlx::query("DELETE FROM task WHERE id = $1")
            .bind(task_id)
            .execute(&dir.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_assignees_and_subtask_parent() {
        let dir = setup().await;
        let task_id = insert_task(&dir, "Ship the release").await;
        let users = [Uuid::new_v4(), Uuid::new_v4()];

        for user_id in users {
            sqlx::query("INSERT INTO task_assignee (task_id, user_id) VALUES ($1, $2)")
                .bind(task_id)
                .bind(user_id)
                .execute(&dir.pool)
                .await
                .unwrap();
        }

        let subtask_id = Uuid::new_v4();
        sqlx::query("INSERT INTO subtask (id, task_id, title) VALUES ($1, $2, 'QA pass')")
            .bind(subtask_id)
            .bind(task_id)
            .execute(&dir.pool)
            .await
            .unwrap();

        let assignees = dir.assignee_ids(task_id).await.unwrap();
        assert_eq!(assignees.len(), 2);
        assert!(assignees.contains(&users[0]));
        assert!(assignees.contains(&users[1]));

        // Missing task has no assignees
        assert!(dir.assignee_ids(Uuid::new_v4()).await.unwrap().is_empty());

        assert_eq!(
            dir.parent_task_of_subtask(subtask_id).await.unwrap(),
            Some(task_id)
        );
        assert_eq!(
            dir.parent_task_of_subtask(Uuid::new_v4()).await.unwrap(),
            None
        );

        sqlx::query("DELETE FROM task WHERE id = $1")
            .bind(task_id)
            .execute(&dir.pool)
            .await
            .unwrap();
    }
}
