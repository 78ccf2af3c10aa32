//! User directory: profile lookups for email addressing and actor naming.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use taskhive_core::{Error, Result, UserDirectory, UserProfile};

/// PostgreSQL implementation of [`UserDirectory`].
pub struct PgUserDirectory {
    pool: Pool<Postgres>,
}

impl PgUserDirectory {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn user_profile(&self, id: Uuid) -> Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT id, display_name, email FROM app_user WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(|r| UserProfile {
            id: r.get("id"),
            display_name: r.get("display_name"),
            email: r.get("email"),
        }))
    }
}
