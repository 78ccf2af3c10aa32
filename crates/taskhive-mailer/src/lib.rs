//! # taskhive-mailer
//!
//! Best-effort email dispatch for taskhive notifications.
//!
//! Rendering produces a plain-text + HTML pair; submission goes through
//! lettre's async SMTP transport in a spawned task. Callers get a join
//! handle they may ignore — delivery failures are logged and never raise
//! past the notification consumer.

pub mod render;
pub mod smtp;

pub use render::notification_email;
pub use smtp::{MailerConfig, SmtpMailer};
