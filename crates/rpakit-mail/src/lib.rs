//! SMTP email adapter (lettre).
//!
//! HTML messages with optional file attachments over a STARTTLS relay.
//! Attachment file names are validated before anything is read, and missing
//! files fail before any SMTP traffic happens.

use std::path::{Path, PathBuf};

use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use rpakit_core::{config::SmtpConfig, errors::Error, Result};

/// Everything needed for one outgoing message.
#[derive(Clone, Debug, Default)]
pub struct OutgoingEmail {
    pub subject: String,
    pub html_body: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub attachments: Vec<PathBuf>,
}

pub struct Mailer {
    sender: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Mailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server)
            .map_err(|e| Error::Mail(format!("smtp relay setup: {e}")))?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.sender.clone(), cfg.password.clone()))
            .build();

        info!(sender = %cfg.sender, server = %cfg.server, port = cfg.port, "mailer initialized");
        Ok(Self {
            sender: cfg.sender.clone(),
            transport,
        })
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if email.to.is_empty() {
            return Err(Error::Mail("at least one recipient is required".to_string()));
        }

        let message = self.build_message(email).await?;

        if email.cc.is_empty() {
            info!(to = ?email.to, subject = %email.subject, "sending email");
        } else {
            info!(to = ?email.to, cc = ?email.cc, subject = %email.subject, "sending email");
        }

        self.transport.send(message).await.map_err(|e| {
            error!("smtp send failed: {e}");
            Error::Mail(format!("error sending the e-mail: {e}"))
        })?;

        info!(to = ?email.to, "email sent");
        Ok(())
    }

    async fn build_message(&self, email: &OutgoingEmail) -> Result<Message> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.sender)?)
            .subject(email.subject.clone());

        for addr in &email.to {
            builder = builder.to(parse_mailbox(addr)?);
        }
        for addr in &email.cc {
            builder = builder.cc(parse_mailbox(addr)?);
        }
        for addr in &email.bcc {
            builder = builder.bcc(parse_mailbox(addr)?);
        }

        let html = SinglePart::html(email.html_body.clone());
        let message = if email.attachments.is_empty() {
            builder.multipart(MultiPart::alternative().singlepart(html))
        } else {
            let mut mixed = MultiPart::mixed().multipart(MultiPart::alternative().singlepart(html));
            for path in &email.attachments {
                mixed = mixed.singlepart(load_attachment(path).await?);
            }
            builder.multipart(mixed)
        };

        message.map_err(|e| Error::Mail(format!("message build failed: {e}")))
    }
}

async fn load_attachment(path: &Path) -> Result<SinglePart> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::InvalidFilename(format!("{} has no usable file name", path.display()))
        })?;
    check_filename(filename)?;

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        error!(path = %path.display(), "attachment read failed: {e}");
        Error::Io(e)
    })?;

    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|e| Error::Mail(format!("content type: {e}")))?;

    info!(path = %path.display(), "attached file");
    Ok(Attachment::new(filename.to_string()).body(bytes, content_type))
}

/// Reject names SMTP gateways tend to mangle: path/shell metacharacters and
/// accented letters.
fn check_filename(filename: &str) -> Result<()> {
    const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let bad = filename
        .chars()
        .any(|c| FORBIDDEN.contains(&c) || (c.is_alphabetic() && !c.is_ascii_alphabetic()));
    if bad {
        return Err(Error::InvalidFilename(format!(
            "filename '{filename}' contains special or accented characters"
        )));
    }
    Ok(())
}

fn parse_mailbox(addr: &str) -> Result<Mailbox> {
    addr.parse()
        .map_err(|e| Error::Mail(format!("invalid address '{addr}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> Mailer {
        Mailer::new(&SmtpConfig {
            sender: "robot@example.com".to_string(),
            password: "secret".to_string(),
            server: "smtp.example.com".to_string(),
            port: 587,
        })
        .unwrap()
    }

    #[test]
    fn check_filename_accepts_plain_names() {
        assert!(check_filename("report_2024-01.pdf").is_ok());
        assert!(check_filename("data.csv").is_ok());
    }

    #[test]
    fn check_filename_rejects_metacharacters_and_accents() {
        assert!(check_filename("bad|name.txt").is_err());
        assert!(check_filename("dir/file.txt").is_err());
        assert!(check_filename("relatório.pdf").is_err());
        assert!(check_filename("ação.csv").is_err());
    }

    #[tokio::test]
    async fn build_message_without_attachments() {
        let email = OutgoingEmail {
            subject: "Monthly report".to_string(),
            html_body: "<h1>Done</h1>".to_string(),
            to: vec!["ops@example.com".to_string()],
            ..Default::default()
        };

        let message = mailer().build_message(&email).await.unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("Monthly report"));
        assert!(raw.contains("<h1>Done</h1>"));
        assert!(raw.contains("ops@example.com"));
    }

    #[tokio::test]
    async fn build_message_rejects_invalid_address() {
        let email = OutgoingEmail {
            subject: "x".to_string(),
            html_body: "y".to_string(),
            to: vec!["not-an-address".to_string()],
            ..Default::default()
        };

        assert!(matches!(
            mailer().build_message(&email).await,
            Err(Error::Mail(_))
        ));
    }

    #[tokio::test]
    async fn send_requires_a_recipient() {
        let email = OutgoingEmail::default();
        assert!(matches!(
            mailer().send(&email).await,
            Err(Error::Mail(_))
        ));
    }

    #[tokio::test]
    async fn missing_attachment_fails_before_smtp() {
        let email = OutgoingEmail {
            subject: "x".to_string(),
            html_body: "y".to_string(),
            to: vec!["ops@example.com".to_string()],
            attachments: vec![PathBuf::from("/tmp/rpakit-definitely-missing.bin")],
            ..Default::default()
        };

        assert!(matches!(
            mailer().build_message(&email).await,
            Err(Error::Io(_))
        ));
    }
}
