//! HTTP client for the text extraction service

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ExtractionProvider, ProviderError};

const REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Serialize)]
struct ExtractionRequest<'a> {
    filename: &'a str,
    content_base64: String,
}

#[derive(Deserialize)]
struct ExtractionResponse {
    text: String,
}

/// Client for the OCR/extraction sidecar service
pub struct HttpExtractionClient {
    client: Client,
    base_url: String,
}

impl HttpExtractionClient {
    pub fn new(base_url: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ExtractionProvider for HttpExtractionClient {
    async fn extract(&self, content: &[u8], filename: &str) -> Result<String, ProviderError> {
        let url = format!("{}/extract", self.base_url);

        tracing::debug!(filename = %filename, bytes = content.len(), "Requesting text extraction");

        let response = self
            .client
            .post(&url)
            .json(&ExtractionRequest {
                filename,
                content_base64: BASE64.encode(content),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let parsed: ExtractionResponse = response.json().await?;
        Ok(parsed.text)
    }
}
