//! reqwest implementation of the backend contract.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use super::{Backend, CHAT_MESSAGE_PATH, ChatReply, ChatRequest, ErrorBody, SURVEY_COMPLETE_PATH};
use crate::config::ClientConfig;
use crate::error::{BackendError, ConfigError};

/// HTTP client for the EcoSense backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a backend client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "ECOSENSE_API_BASE_URL".to_string(),
                message: format!("expected an http(s) URL, got {:?}", config.api_base_url),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-2xx response into `BackendError::Status`, keeping the
    /// backend's `message` if the body carries one.
    async fn status_error(resp: reqwest::Response) -> BackendError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message);
        warn!(status, body = %body, "Backend request failed");
        BackendError::Status { status, message }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send_chat_message(&self, content: &str) -> Result<ChatReply, BackendError> {
        // The payload is encoded to text up front and sent as-is under a JSON
        // content type, matching what the web client puts on the wire.
        let body = serde_json::to_string(&ChatRequest {
            content: content.to_string(),
        })
        .map_err(BackendError::Encode)?;
        debug!(body = %body, "Sending chat message");

        let resp = self
            .client
            .post(self.api_url(CHAT_MESSAGE_PATH))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::status_error(resp).await);
        }

        let text = resp.text().await?;
        serde_json::from_str::<ChatReply>(&text)
            .map_err(|e| BackendError::InvalidResponse(format!("{e}: {text}")))
    }

    async fn complete_survey(&self) -> Result<(), BackendError> {
        let resp = self
            .client
            .post(self.api_url(SURVEY_COMPLETE_PATH))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::status_error(resp).await);
        }
        debug!("Survey completion acknowledged");
        Ok(())
    }
}
