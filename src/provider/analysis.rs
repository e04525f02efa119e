//! OpenAI-backed analysis and embedding provider
//!
//! Uses structured extraction so the verdict arrives as a typed value
//! instead of free-form text that needs re-parsing.

use async_trait::async_trait;
use rig::client::{CompletionClient, EmbeddingsClient};
use rig::embeddings::EmbeddingModel as _;
use rig::providers::openai;
use std::env;

use super::{AnalysisProvider, ProviderError};
use crate::model::ClaimAnalysis;

const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_ANALYSIS_MODEL: &str = "ANALYSIS_MODEL";
const ENV_EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";

const DEFAULT_ANALYSIS_MODEL: &str = openai::GPT_4O_MINI;
const DEFAULT_EMBEDDING_MODEL: &str = openai::TEXT_EMBEDDING_3_SMALL;

/// Output size of `text-embedding-3-small`. The pgvector column is declared
/// with this dimension; a mismatched embedding write is rejected by Postgres.
pub const EMBEDDING_DIMENSIONS: usize = 1536;

// Embedding model context limit, expressed in characters
const MAX_EMBED_CHARS: usize = 8000;

const SYSTEM_PROMPT: &str = "You are an experienced insurance claim adjuster. \
Assess claims strictly against the provided policy context and respond with a \
structured verdict.";

const EMPTY_CONTEXT_NOTE: &str = "No specific policy documents provided.";

pub struct OpenAiAnalysisClient {
    client: openai::Client,
    analysis_model: String,
    embedding_model: String,
}

impl OpenAiAnalysisClient {
    /// Create a client from the environment. Fails when `OPENAI_API_KEY`
    /// is unset so misconfiguration surfaces at startup, not mid-pipeline.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = env::var(ENV_OPENAI_API_KEY)
            .map_err(|_| ProviderError::Llm(format!("{} is not set", ENV_OPENAI_API_KEY)))?;

        let analysis_model =
            env::var(ENV_ANALYSIS_MODEL).unwrap_or_else(|_| DEFAULT_ANALYSIS_MODEL.to_string());
        let embedding_model =
            env::var(ENV_EMBEDDING_MODEL).unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());

        tracing::info!(model = %analysis_model, "OpenAI analysis client configured");

        Ok(Self::with_key(&api_key, analysis_model, embedding_model))
    }

    pub fn with_key(api_key: &str, analysis_model: String, embedding_model: String) -> Self {
        Self {
            client: openai::Client::new(api_key),
            analysis_model,
            embedding_model,
        }
    }
}

/// Fill the prompt template's placeholders
fn build_prompt(template: &str, context: &str, claim_text: &str) -> String {
    let context = if context.is_empty() {
        EMPTY_CONTEXT_NOTE
    } else {
        context
    };

    template
        .replace("{context}", context)
        .replace("{claim_text}", claim_text)
}

#[async_trait]
impl AnalysisProvider for OpenAiAnalysisClient {
    async fn analyze(
        &self,
        claim_text: &str,
        context: &str,
        template: &str,
    ) -> Result<ClaimAnalysis, ProviderError> {
        let prompt = build_prompt(template, context, claim_text);

        tracing::debug!(
            model = %self.analysis_model,
            prompt_chars = prompt.len(),
            "Running claim analysis"
        );

        let extractor = self
            .client
            .extractor::<ClaimAnalysis>(&self.analysis_model)
            .preamble(SYSTEM_PROMPT)
            .build();

        let analysis = extractor
            .extract(&prompt)
            .await
            .map_err(|e| ProviderError::Llm(format!("Analysis extraction failed: {}", e)))?;

        Ok(analysis)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let truncated = if text.len() > MAX_EMBED_CHARS {
            let mut end = MAX_EMBED_CHARS;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            &text[..end]
        } else {
            text
        };

        let model = self.client.embedding_model(&self.embedding_model);
        let embedding = model
            .embed_text(truncated)
            .await
            .map_err(|e| ProviderError::Llm(format!("Embedding failed: {}", e)))?;

        Ok(embedding.vec.into_iter().map(|v| v as f32).collect())
    }

    fn model_id(&self) -> &str {
        &self.analysis_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_substitutes_placeholders() {
        let template = "Context:\n{context}\n\nClaim:\n{claim_text}";
        let prompt = build_prompt(template, "policy text", "claim text");
        assert_eq!(prompt, "Context:\npolicy text\n\nClaim:\nclaim text");
    }

    #[test]
    fn test_build_prompt_empty_context_gets_note() {
        let prompt = build_prompt("{context}|{claim_text}", "", "c");
        assert_eq!(prompt, format!("{}|c", EMPTY_CONTEXT_NOTE));
    }

    #[test]
    fn test_client_construction_reports_model() {
        let client = OpenAiAnalysisClient::with_key(
            "test-key",
            "analysis-model".to_string(),
            DEFAULT_EMBEDDING_MODEL.to_string(),
        );
        assert_eq!(client.model_id(), "analysis-model");
    }
}
