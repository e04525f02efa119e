//! HTTP client for the de-identification service

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Deidentified, DeidentificationProvider, ProviderError};

// Entity recognition over long documents is slow; match the service's own
// worker timeout.
const REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Serialize)]
struct DeidentifyRequest<'a> {
    text: &'a str,
    country: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct DeidentifyResponse {
    anonymized_text: String,
    #[serde(default)]
    entities_found: Vec<String>,
}

/// Client for the personal-data removal service
pub struct HttpDeidentifyClient {
    client: Client,
    base_url: String,
}

impl HttpDeidentifyClient {
    pub fn new(base_url: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl DeidentificationProvider for HttpDeidentifyClient {
    async fn deidentify(
        &self,
        text: &str,
        country: &str,
        language: &str,
    ) -> Result<Deidentified, ProviderError> {
        let url = format!("{}/anonymize", self.base_url);

        tracing::debug!(country = %country, chars = text.len(), "Requesting de-identification");

        let response = self
            .client
            .post(&url)
            .json(&DeidentifyRequest {
                text,
                country,
                language,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let parsed: DeidentifyResponse = response.json().await?;
        Ok(Deidentified {
            text: parsed.anonymized_text,
            entities_found: parsed.entities_found,
        })
    }
}
