use std::time::Duration;

use async_trait::async_trait;

use super::Notifier;
use crate::config::NotifyConfig;
use crate::error::PortalError;
use crate::models::{NotificationErrorBody, NotificationRequest, NotificationResponse};

/// Posts notifications to the email relay.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, PortalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PortalError::Notification(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn from_config(config: &NotifyConfig) -> Result<Self, PortalError> {
        Self::new(config.url.clone(), config.api_key.clone())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResponse, PortalError> {
        let mut req = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| PortalError::Notification(format!("Relay request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<NotificationErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("relay returned {status}"));
            return Err(PortalError::Notification(reason));
        }

        resp.json::<NotificationResponse>()
            .await
            .map_err(|e| PortalError::Notification(format!("Invalid relay response: {e}")))
    }
}
