// Webhook delivery
//
// One POST per call; retry policy lives with the caller. The queue consumer
// re-enqueues failed tasks with backoff. The synchronous dispatch path does
// not retry; a failure there surfaces at the per-talk isolation boundary.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::errors::DeliveryError;
use crate::models::DispatchBody;

/// Posts announcement payloads to the configured webhook.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    client: Client,
}

impl WebhookSender {
    /// Create a sender with the given request timeout.
    pub fn new(timeout_seconds: u64) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| DeliveryError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }

    /// POST the JSON body; any non-2xx response is a failure.
    #[instrument(skip(self, body), fields(content_len = body.content.len()))]
    pub async fn send(&self, webhook_url: &str, body: &DispatchBody) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(webhook_url)
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        debug!(status = status.as_u16(), "Webhook delivery succeeded");
        Ok(())
    }
}
