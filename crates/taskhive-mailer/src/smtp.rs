//! SMTP mailer: non-blocking submission over an async transport.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use taskhive_core::{Error, MailSender, OutboundEmail, Result};

/// SMTP configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// From header, e.g. `Taskhive <no-reply@taskhive.example>`.
    pub from: String,
    /// When disabled, sends resolve Ok without any network I/O.
    pub enabled: bool,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            from: "Taskhive <no-reply@taskhive.example>".to_string(),
            enabled: true,
        }
    }
}

impl MailerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SMTP_HOST` | `localhost` | SMTP relay host |
    /// | `SMTP_PORT` | `587` | SMTP relay port (STARTTLS) |
    /// | `SMTP_USERNAME` | — | Relay credentials (optional) |
    /// | `SMTP_PASSWORD` | — | Relay credentials (optional) |
    /// | `SMTP_FROM` | `Taskhive <no-reply@taskhive.example>` | From header |
    /// | `SMTP_ENABLED` | `true` | Disable to run without a relay |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("SMTP_HOST").unwrap_or(defaults.host),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            from: std::env::var("SMTP_FROM").unwrap_or(defaults.from),
            enabled: std::env::var("SMTP_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

/// [`MailSender`] backed by lettre's async SMTP transport.
///
/// `send` spawns the delivery and returns immediately; failures are logged
/// inside the task and reported only through the returned handle.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    enabled: bool,
}

impl SmtpMailer {
    pub fn new(config: MailerConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| Error::Config(format!("Invalid SMTP_FROM: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| Error::Config(format!("Invalid SMTP relay {}: {e}", config.host)))?
            .port(config.port);

        if let (Some(username), Some(password)) = (config.username, config.password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            enabled: config.enabled,
        })
    }

    /// Build a mailer from `SMTP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(MailerConfig::from_env())
    }

    async fn deliver(
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
        email: OutboundEmail,
    ) -> Result<()> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| Error::Mail(format!("Invalid recipient address: {e}")))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(
                email.text_body,
                email.html_body,
            ))
            .map_err(|e| Error::Mail(format!("Failed to build email: {e}")))?;

        transport
            .send(message)
            .await
            .map_err(|e| Error::Mail(e.to_string()))?;
        Ok(())
    }
}

impl MailSender for SmtpMailer {
    fn send(&self, email: OutboundEmail) -> JoinHandle<Result<()>> {
        if !self.enabled {
            debug!(
                subsystem = "mailer",
                to = %email.to,
                subject = %email.subject,
                "SMTP disabled, dropping email"
            );
            return tokio::spawn(async { Ok(()) });
        }

        let transport = self.transport.clone();
        let from = self.from.clone();
        tokio::spawn(async move {
            let to = email.to.clone();
            let result = Self::deliver(transport, from, email).await;
            match &result {
                Ok(()) => debug!(subsystem = "mailer", %to, "Email submitted"),
                Err(e) => warn!(subsystem = "mailer", %to, error = %e, "Email delivery failed"),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::notification_email;

    #[test]
    fn test_config_defaults() {
        let config = MailerConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 587);
        assert!(config.enabled);
        assert!(config.username.is_none());
    }

    #[test]
    fn test_invalid_from_is_a_config_error() {
        let config = MailerConfig {
            from: "not an address".to_string(),
            ..MailerConfig::default()
        };
        assert!(matches!(SmtpMailer::new(config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_disabled_mailer_resolves_ok_without_io() {
        let mailer = SmtpMailer::new(MailerConfig {
            enabled: false,
            ..MailerConfig::default()
        })
        .unwrap();

        let handle = mailer.send(notification_email(
            "ada@example.com",
            "Task assigned to you",
            "body",
            None,
        ));
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_bad_recipient_surfaces_only_through_handle() {
        // Points at localhost; the invalid address fails before any
        // connection is attempted.
        let mailer = SmtpMailer::new(MailerConfig::default()).unwrap();
        let handle = mailer.send(notification_email("not-an-address", "s", "b", None));
        assert!(matches!(handle.await.unwrap(), Err(Error::Mail(_))));
    }
}
