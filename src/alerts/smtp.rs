//! Mail delivery over SMTP submission with STARTTLS

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

use super::{AlertEvent, Notifier, NotifyError};

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address
    pub from: String,
}

/// Sends alerts as plain-text mails
///
/// The transport is built once and reused for every alert.
#[derive(Clone, Debug)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(settings: SmtpSettings, timeout: Duration) -> Result<Self, NotifyError> {
        let from = parse_mailbox(&settings.from)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(settings.username, settings.password))
            .timeout(Some(timeout))
            .build();

        Ok(Self { transport, from })
    }

    /// Build the mail for an alert
    pub fn build_message(&self, event: &AlertEvent) -> Result<Message, NotifyError> {
        let to = parse_mailbox(&event.destination)?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(event.subject.clone())
            .date_now()
            .header(ContentType::TEXT_PLAIN)
            .body(event.message.clone())
            .map_err(|e| NotifyError::Message(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[instrument(skip(self, event), fields(host = %event.host, to = %event.destination))]
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        let message = self.build_message(event)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!("Email sent successfully!");
        Ok(())
    }
}
