//! Structured logging field name constants for taskhive.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention (dead-letter candidates) |
//! | WARN  | Recoverable issue, recipient skipped, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), fan-out completions |
//! | DEBUG | Decision points, routing choices, empty recipient sets |
//! | TRACE | Per-recipient iteration detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "notify", "db", "mailer", "notifyd"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "comment_consumer", "task_consumer", "publisher", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "dispatch", "create_bulk", "send_email", "cleanup"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Event envelope dedup/trace token (UUIDv7).
pub const MESSAGE_ID: &str = "message_id";

/// Wire name of the event being processed.
pub const EVENT_TYPE: &str = "event_type";

/// Notification type of a persisted record.
pub const NOTIFICATION_TYPE: &str = "notification_type";

/// Recipient user id.
pub const TARGET_ID: &str = "target_id";

/// Acting user id.
pub const AUTHOR_ID: &str = "author_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of notification records produced by a fan-out.
pub const RESULT_COUNT: &str = "result_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
