//! Generic webhook alerts
//!
//! Posts a JSON document per alert:
//!
//! ```json
//! {
//!     "message": "The host db is not responding to ICMP requests.",
//!     "subject": "Host db is down!",
//!     "host": "db",
//!     "recipient": "ops@example.com",
//!     "timestamp": "2025-01-01T00:00:00+00:00"
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, instrument};

use super::{AlertEvent, Notifier, NotifyError};

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, event), fields(host = %event.host))]
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        let payload = json!({
            "message": event.message,
            "subject": event.subject,
            "host": event.host,
            "recipient": event.destination,
            "timestamp": event.timestamp.to_rfc3339()
        });

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent webhook alert");
                    Ok(())
                } else {
                    debug!("webhook alert failed with status: {}", response.status());
                    Err(NotifyError::Rejected {
                        status: response.status().as_u16(),
                    })
                }
            }
            Err(e) if e.is_timeout() => Err(NotifyError::Timeout(self.timeout)),
            Err(e) => Err(NotifyError::Transport(e.to_string())),
        }
    }
}
