//! Email channel sender over SMTP.
//!
//! The sender talks to the mail infrastructure through the narrow
//! `MailTransport` trait so tests can substitute an in-memory mock. The
//! production implementation is `SmtpMailer`, built on lettre's async
//! SMTP transport.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use super::{ChannelSender, DeliveryReceipt};
use crate::config::EmailSettings;
use crate::error::{DispatchError, Result};
use crate::notification::{Channel, Notification};

/// Metadata key the email sender reads to select an HTML body.
pub const METADATA_HTML_BODY: &str = "html";

/// Errors raised by the underlying mail infrastructure.
///
/// Kept distinct from `DispatchError` so callers can tell infrastructure
/// failures apart from validation failures.
#[derive(Error, Debug)]
pub enum MailTransportError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Narrow mail-sending capability consumed by the email sender.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_mail(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> std::result::Result<(), MailTransportError>;
}

/// SMTP mail transport backed by lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from settings. TLS uses the relay builder; plaintext
    /// (local dev relays) uses the unencrypted builder.
    pub fn new(settings: &EmailSettings) -> std::result::Result<Self, MailTransportError> {
        let mut builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_host)
        };
        builder = builder.port(settings.smtp_port);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: settings.from_address.parse()?,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send_mail(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> std::result::Result<(), MailTransportError> {
        let content_type = if is_html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .header(content_type)
            .body(body.to_string())?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Email channel sender.
///
/// SMTP acceptance is not delivery confirmation, so successful sends report
/// `Accepted` and the record lands in `Sent` rather than `Delivered`.
pub struct EmailSender {
    transport: Arc<dyn MailTransport>,
}

impl EmailSender {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn deliver(&self, notification: &Notification) -> Result<DeliveryReceipt> {
        let subject = notification.subject.as_deref().unwrap_or_default();
        let is_html = notification.metadata_flag(METADATA_HTML_BODY);

        self.transport
            .send_mail(&notification.recipient, subject, &notification.message, is_html)
            .await
            .map_err(|e| DispatchError::ExternalService(format!("email service error: {e}")))?;

        tracing::debug!(
            notification_id = %notification.id,
            recipient = %notification.recipient,
            html = is_html,
            "Email handed to SMTP transport"
        );

        Ok(DeliveryReceipt::Accepted)
    }
}
