//! Error types for taskhive.

use thiserror::Error;

/// Result type alias using taskhive's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for taskhive operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Notification not found
    #[error("Notification not found: {0}")]
    NotificationNotFound(uuid::Uuid),

    /// Requester does not own the notification it tried to touch
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Email build or send failed
    #[error("Mail error: {0}")]
    Mail(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_notification_not_found() {
        let id = Uuid::nil();
        let err = Error::NotificationNotFound(id);
        assert_eq!(err.to_string(), format!("Notification not found: {}", id));
    }

    #[test]
    fn test_error_display_forbidden() {
        let err = Error::Forbidden("not the notification owner".to_string());
        assert_eq!(err.to_string(), "Forbidden: not the notification owner");
    }

    #[test]
    fn test_error_display_mail() {
        let err = Error::Mail("connection refused".to_string());
        assert_eq!(err.to_string(), "Mail error: connection refused");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing SMTP_HOST".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing SMTP_HOST");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
