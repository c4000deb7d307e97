//! Outgoing mail
//!
//! Confirmation and recovery codes are delivered by a [`Mailer`]. Production
//! deployments use SMTP through lettre; without SMTP settings the codes are
//! written to the log instead.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Default SMTP submission port
const DEFAULT_SMTP_PORT: u16 = 587;

/// Mail errors
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SMTP configuration error: {0}")]
    SmtpConfig(String),

    #[error("Message format error: {0}")]
    MessageFormat(String),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Kinds of mail the service sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    ConfirmEmail { code: u16, valid_for: Duration },
    RecoveryCode { code: u16, valid_for: Duration },
}

impl MailKind {
    pub fn code(&self) -> u16 {
        match self {
            MailKind::ConfirmEmail { code, .. } | MailKind::RecoveryCode { code, .. } => *code,
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            MailKind::ConfirmEmail { .. } => "Confirm your email",
            MailKind::RecoveryCode { .. } => "Password recovery",
        }
    }

    pub fn body(&self) -> String {
        match self {
            MailKind::ConfirmEmail { code, valid_for } => format!(
                "Your confirmation code: {code}\n\nIt is valid for {}.",
                describe_validity(*valid_for)
            ),
            MailKind::RecoveryCode { code, valid_for } => format!(
                "Your password recovery code: {code}\n\nIt is valid for {}. \
                 If you did not request it, ignore this message.",
                describe_validity(*valid_for)
            ),
        }
    }
}

/// "10 minutes", "1 minute" or "90 seconds"
fn describe_validity(valid_for: Duration) -> String {
    let secs = valid_for.as_secs();
    let (amount, unit) = if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    let plural = if amount == 1 { "" } else { "s" };
    format!("{amount} {unit}{plural}")
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, kind: MailKind) -> Result<(), MailError>;
}

/// SMTP settings
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl SmtpConfig {
    /// Read SMTP settings; `Ok(None)` when `SMTP_HOST` is unset
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, MailError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(host) = lookup("SMTP_HOST").filter(|h| !h.is_empty()) else {
            return Ok(None);
        };

        let port = match lookup("SMTP_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| MailError::SmtpConfig(format!("invalid SMTP_PORT: {raw}")))?,
            None => DEFAULT_SMTP_PORT,
        };

        let from = lookup("SMTP_FROM")
            .ok_or_else(|| MailError::SmtpConfig("SMTP_FROM not set".to_string()))?;

        Ok(Some(Self {
            host,
            port,
            username: lookup("SMTP_USER").unwrap_or_else(|| from.clone()),
            password: lookup("SMTP_PASSWORD").unwrap_or_default(),
            from,
        }))
    }
}

/// Mailer that delivers through an SMTP relay
pub struct SmtpMailer {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| MailError::SmtpConfig(format!("invalid SMTP_FROM: {e}")))?;

        let transport = SmtpTransport::relay(&config.host)
            .map_err(|e| MailError::SmtpConfig(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { from, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, kind: MailKind) -> Result<(), MailError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| MailError::MessageFormat(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(kind.subject())
            .body(kind.body())
            .map_err(|e| MailError::MessageFormat(e.to_string()))?;

        // lettre's SmtpTransport is blocking
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::SendFailed(e.to_string()))?
            .map_err(|e| MailError::SendFailed(e.to_string()))?;

        Ok(())
    }
}

/// Mailer that only logs; used when SMTP is not configured
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, kind: MailKind) -> Result<(), MailError> {
        tracing::info!(to, subject = kind.subject(), "mail delivery skipped (SMTP not configured)");
        tracing::debug!(to, body = %kind.body(), "undelivered mail");
        Ok(())
    }
}
