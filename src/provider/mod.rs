//! External provider interfaces
//!
//! Every dependency the pipeline calls out to sits behind a trait here:
//! text extraction, de-identification, LLM analysis and embeddings, blob
//! storage and report rendering. The orchestrator only sees the traits, so
//! a provider can be swapped without touching pipeline logic.

pub mod analysis;
pub mod deidentify;
pub mod extraction;
pub mod report;
pub mod storage;

use async_trait::async_trait;

use crate::model::{Claim, ClaimAnalysis, ContextSource};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}

/// Extracts raw text from an uploaded document (OCR for scans, direct text
/// extraction otherwise).
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    async fn extract(&self, content: &[u8], filename: &str) -> Result<String, ProviderError>;
}

/// Result of de-identifying one document's text
#[derive(Debug, Clone)]
pub struct Deidentified {
    pub text: String,
    pub entities_found: Vec<String>,
}

/// Removes personal data from cleaned text, using country-specific entity
/// recognizers.
#[async_trait]
pub trait DeidentificationProvider: Send + Sync {
    async fn deidentify(
        &self,
        text: &str,
        country: &str,
        language: &str,
    ) -> Result<Deidentified, ProviderError>;
}

/// LLM access for claim analysis and corpus embeddings
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Run the analysis prompt over the claim text and retrieved context,
    /// returning the structured verdict.
    async fn analyze(
        &self,
        claim_text: &str,
        context: &str,
        template: &str,
    ) -> Result<ClaimAnalysis, ProviderError>;

    /// Embed a text for similarity search
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Identifier of the analysis model, recorded on claims and reports
    fn model_id(&self) -> &str;
}

/// Content-addressed blob storage for uploads and generated reports
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, content: &[u8]) -> Result<(), ProviderError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, ProviderError>;

    /// Short-lived URL for downloading a stored blob
    async fn presign(&self, key: &str) -> Result<String, ProviderError>;
}

/// Renders the persisted report artifact for an analyzed claim
pub trait ReportRenderer: Send + Sync {
    fn render(
        &self,
        claim: &Claim,
        analysis: &ClaimAnalysis,
        sources: &[ContextSource],
        model_used: &str,
        prompt_id: &str,
    ) -> Result<Vec<u8>, ProviderError>;

    fn file_extension(&self) -> &str;
}
