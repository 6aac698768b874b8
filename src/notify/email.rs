use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::render::DigestEmail;
use crate::config::{ConfigError, SmtpSettings};

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &DigestEmail, recipient: &str) -> Result<()>;
}

/// STARTTLS relay with login credentials.
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, ConfigError> {
        let creds = Credentials::new(settings.user.clone(), settings.pass.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| ConfigError::Invalid(format!("SMTP_HOST: {e}")))?
            .credentials(creds)
            .build();
        let from = settings
            .from
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("DIGEST_EMAIL_FROM: {e}")))?;
        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &DigestEmail, recipient: &str) -> Result<()> {
        let to: Mailbox = recipient
            .parse()
            .with_context(|| format!("invalid recipient {recipient}"))?;
        let msg = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(header::ContentType::TEXT_HTML)
            .body(email.html.clone())
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
