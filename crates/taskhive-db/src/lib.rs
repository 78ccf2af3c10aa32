//! # taskhive-db
//!
//! PostgreSQL database layer for taskhive.
//!
//! This crate provides:
//! - Connection pool management
//! - The notification repository (create, list, read/dismiss, cleanup)
//! - Read-only task and user directory lookups for the pipeline consumers
//!
//! ## Example
//!
//! ```rust,ignore
//! use taskhive_db::Database;
//! use taskhive_core::NotificationStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/taskhive").await?;
//!     let unread = db.notifications.unread_count(user_id).await?;
//!     println!("{unread} unread");
//!     Ok(())
//! }
//! ```
pub mod directory;
pub mod notifications;
pub mod pool;
pub mod tasks;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use taskhive_core::*;

// Re-export repository implementations
pub use directory::PgUserDirectory;
pub use notifications::PgNotificationRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use tasks::PgTaskDirectory;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Notification repository (create, list, read/dismiss, cleanup).
    pub notifications: PgNotificationRepository,
    /// Task directory for title/assignee/subtask lookups.
    pub tasks: PgTaskDirectory,
    /// User directory for profile lookups.
    pub users: PgUserDirectory,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notifications: PgNotificationRepository::new(pool.clone()),
            tasks: PgTaskDirectory::new(pool.clone()),
            users: PgUserDirectory::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
