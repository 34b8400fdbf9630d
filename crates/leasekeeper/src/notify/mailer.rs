use std::path::Path;
use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, FileTransport, Message, SmtpTransport, Transport};
use tracing::{info, warn};

use super::{EmailMessage, MailTransport, NotifyError};
use crate::config::{MailConfig, MailTransportConfig};

fn build_message(from: &Mailbox, email: &EmailMessage) -> Result<Message, NotifyError> {
    let address = email
        .to
        .trim()
        .parse::<Address>()
        .map_err(|_| NotifyError::Address(email.to.clone()))?;
    let to = Mailbox::new(email.to_name.clone(), address);

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .map_err(|e| NotifyError::Transport(format!("build message: {e}")))
}

fn parse_from(from: &str) -> Result<Mailbox, NotifyError> {
    from.parse::<Mailbox>()
        .map_err(|_| NotifyError::Address(from.to_string()))
}

/// SMTP relay with STARTTLS.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from: &str,
    ) -> Result<Self, NotifyError> {
        let mut builder = SmtpTransport::starttls_relay(host)
            .map_err(|e| NotifyError::Transport(format!("create SMTP transport: {e}")))?
            .port(port);
        if !username.is_empty() {
            builder = builder.credentials(Credentials::new(username.to_string(), password.to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from: parse_from(from)?,
        })
    }
}

impl MailTransport for SmtpMailer {
    fn deliver(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let message = build_message(&self.from, message)?;
        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|e| NotifyError::Transport(format!("send SMTP email: {e}")))
    }
}

/// Writes `.eml` files into a directory; meant for development.
pub struct FileMailer {
    transport: FileTransport,
    from: Mailbox,
}

impl FileMailer {
    pub fn new(dir: &Path, from: &str) -> Result<Self, NotifyError> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .map_err(|e| NotifyError::Transport(format!("create outbox directory: {e}")))?;
        }

        Ok(Self {
            transport: FileTransport::new(dir),
            from: parse_from(from)?,
        })
    }
}

impl MailTransport for FileMailer {
    fn deliver(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let message = build_message(&self.from, message)?;
        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|e| NotifyError::Transport(format!("write email file: {e}")))
    }
}

/// Emits messages to the trace log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl MailTransport for LogMailer {
    fn deliver(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        info!(to = %message.to, subject = %message.subject, body = %message.body, "outbound email");
        Ok(())
    }
}

pub fn transport_from_config(config: &MailConfig) -> Result<Arc<dyn MailTransport>, NotifyError> {
    let transport: Arc<dyn MailTransport> = match &config.transport {
        MailTransportConfig::Smtp {
            host,
            port,
            username,
            password,
        } => {
            if username.is_empty() {
                warn!(%host, "SMTP credentials are not configured");
            }
            Arc::new(SmtpMailer::new(host, *port, username, password, &config.from)?)
        }
        MailTransportConfig::File { dir } => Arc::new(FileMailer::new(dir, &config.from)?),
        MailTransportConfig::Log => Arc::new(LogMailer),
    };
    Ok(transport)
}
