//! Named default values shared across the taskhive crates.
//!
//! Environment variables override most of these at runtime; the constants
//! here are the single source for the fallback values.

/// Buffer capacity of the notification event bus.
///
/// 256 for production; tests typically use 32.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Default page size for notification list queries.
pub const NOTIFICATION_PAGE_SIZE: i64 = 50;

/// Hard cap on a single notification list page.
pub const NOTIFICATION_PAGE_SIZE_MAX: i64 = 200;

/// Days a read notification is retained before the cleanup sweep removes it.
pub const NOTIFICATION_RETENTION_DAYS: i64 = 90;

/// Trailing window (minutes) for the recent-duplicate debounce lookup.
pub const DEBOUNCE_WINDOW_MINUTES: i64 = 15;

/// Interval between retention cleanup sweeps, in seconds (24h).
pub const CLEANUP_INTERVAL_SECS: u64 = 86_400;

/// Title used when a comment's task can no longer be resolved.
pub const PLACEHOLDER_TASK_TITLE: &str = "a task";

/// Display name used when an actor's profile cannot be resolved.
pub const PLACEHOLDER_ACTOR_NAME: &str = "Someone";
