//! Down-alert delivery
//!
//! An [`AlertEvent`] is built by the result router for every unreachable host
//! (unless the run is console-only) and handed to a [`Notifier`]. Delivery is
//! best effort: failures come back as [`NotifyError`] and are logged by the
//! caller, never retried here.

pub mod smtp;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{AlertChannelConfig, AlertConfig};
use crate::hosts::{Host, HostId};

pub use smtp::{SmtpNotifier, SmtpSettings};
pub use webhook::WebhookNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("could not build alert message: {0}")]
    Message(String),

    #[error("alert transport failed: {0}")]
    Transport(String),

    #[error("alert endpoint rejected the alert with status {status}")]
    Rejected { status: u16 },

    #[error("alert delivery did not finish within {0:?}")]
    Timeout(Duration),
}

/// A down-notification for one host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub host: HostId,
    pub destination: String,
    pub subject: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    /// Alert for a host that did not answer its probe
    pub fn host_down(host: &Host, timestamp: DateTime<Utc>) -> Self {
        Self {
            host: host.id.clone(),
            destination: host.destination.clone(),
            subject: format!("Host {} is down!", host.id),
            message: format!("The host {} is not responding to ICMP requests.", host.id),
            timestamp,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `event` to its destination
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError>;

    /// Whether a successful `notify` means the alert reached someone
    fn delivers(&self) -> bool {
        true
    }
}

/// Drops alerts after logging them
#[derive(Debug, Default, Clone)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        debug!(host = %event.host, "alerting disabled, dropping alert for {}", event.destination);
        Ok(())
    }

    fn delivers(&self) -> bool {
        false
    }
}

/// Build the notifier selected in the configuration
pub fn from_config(config: &AlertConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    let timeout = Duration::from_secs(config.timeout);

    let notifier: Arc<dyn Notifier> = match &config.channel {
        AlertChannelConfig::None => Arc::new(NullNotifier),
        AlertChannelConfig::Smtp {
            host,
            port,
            username,
            password,
            from,
        } => Arc::new(SmtpNotifier::new(
            SmtpSettings {
                host: host.clone(),
                port: *port,
                username: username.clone(),
                password: password.clone(),
                from: from.clone().unwrap_or_else(|| username.clone()),
            },
            timeout,
        )?),
        AlertChannelConfig::Webhook { url } => Arc::new(WebhookNotifier::new(url.clone(), timeout)?),
    };

    Ok(notifier)
}
