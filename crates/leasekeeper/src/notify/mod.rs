//! Outbound email. Workflows hand messages to a [`Notifier`]; delivery happens later through a
//! [`MailTransport`] so a mail outage never blocks or reverts a committed write.

mod mailer;
mod outbound;
pub mod templates;

pub use mailer::{transport_from_config, FileMailer, LogMailer, SmtpMailer};
pub use outbound::{FlushReport, OutboundQueue};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Accepts a message for eventual delivery.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: EmailMessage) -> Result<(), NotifyError>;
}

/// Performs one delivery attempt.
pub trait MailTransport: Send + Sync {
    fn deliver(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid mail address {0}")]
    Address(String),
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("outbound queue unavailable")]
    QueueUnavailable,
}

impl NotifyError {
    /// Errors that no amount of retrying will fix.
    pub fn is_permanent(&self) -> bool {
        matches!(self, NotifyError::Address(_))
    }
}
