use async_trait::async_trait;
use reqwest::Client;

use crate::config::CompletionConfig;
use crate::error::{DocQaError, Result};
use crate::models::{CompletionRequest, CompletionResponse};

#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse>;
}

/// Together-style `/completions` endpoint. One attempt per call.
pub struct TogetherTransport {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl TogetherTransport {
    pub fn new(api_key: String, base_url: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(DocQaError::Config(
                "completion api key cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            endpoint: format!("{}/completions", base_url.trim_end_matches('/')),
        })
    }

    /// None when no credential is configured.
    pub fn from_config(cfg: &CompletionConfig) -> Result<Option<Self>> {
        match cfg.credential() {
            Some(key) => Self::new(key.to_string(), &cfg.base_url).map(Some),
            None => Ok(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionTransport for TogetherTransport {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        tracing::debug!(
            model = %req.model,
            max_tokens = req.max_tokens,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DocQaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(|e| {
            DocQaError::Internal(format!("Failed to parse completion response: {e}"))
        })
    }
}
