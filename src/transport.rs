use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::TransportError;

/// Default request timeout for a single delivery attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body posted to a chat incoming-webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub bot_name: String,
    pub bot_icon_image: String,
    /// Short preview text shown in notifications.
    pub text: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub color: String,
    pub text: String,
}

impl WebhookPayload {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            bot_name: envelope.display_name().to_string(),
            bot_icon_image: envelope.icon().to_string(),
            text: envelope.title().to_string(),
            attachments: vec![Attachment {
                color: envelope.color().to_string(),
                text: envelope.body().to_string(),
            }],
        }
    }
}

/// Delivers one payload to one URL.
///
/// Implementations report the HTTP status the endpoint answered with;
/// deciding what counts as success is left to the worker.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, payload: &WebhookPayload) -> Result<u16, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

#[cfg(feature = "http")]
impl HttpTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[cfg(feature = "http")]
impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, payload: &WebhookPayload) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().as_u16()),
            Err(err) if err.is_timeout() => Err(TransportError::Timeout),
            Err(err) if err.is_connect() => Err(TransportError::Connect(err.to_string())),
            Err(err) => Err(TransportError::Request(err.to_string())),
        }
    }
}
