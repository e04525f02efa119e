//! Retrieval-augmented context assembly for claim analysis
//!
//! The query text is embedded, matched against the reference corpus of the
//! claim's country, and the top hits are packed into a character budget in
//! similarity order.

use std::sync::Arc;

use crate::db::corpus::ReferenceDocumentRepository;
use crate::model::{ContextSource, RetrievalConfig, ScoredReference};
use crate::provider::AnalysisProvider;
use crate::service::error::PipelineError;

// Rough tokens-to-characters conversion for the context budget
const CHARS_PER_TOKEN: usize = 4;

// A truncated excerpt shorter than this adds noise, not signal; stop
// packing instead.
const MIN_EXCERPT_CHARS: usize = 500;

const SOURCE_SEPARATOR: &str = "\n\n---\n\n";

/// Context assembled for one analysis run
#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    pub text: String,
    pub sources: Vec<ContextSource>,
}

pub struct ContextAssembler {
    corpus: ReferenceDocumentRepository,
    analysis: Arc<dyn AnalysisProvider>,
    config: RetrievalConfig,
}

impl ContextAssembler {
    pub fn new(
        corpus: ReferenceDocumentRepository,
        analysis: Arc<dyn AnalysisProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            corpus,
            analysis,
            config,
        }
    }

    /// Similarity search against the corpus, used both for context assembly
    /// and for the corpus search endpoint.
    pub async fn search(
        &self,
        query: &str,
        country: &str,
        category: Option<&str>,
    ) -> Result<Vec<ScoredReference>, PipelineError> {
        let embedding = self.analysis.embed(query).await?;
        let hits = self
            .corpus
            .search(
                &embedding,
                country,
                category,
                self.config.similarity_threshold,
                self.config.top_k,
            )
            .await?;
        Ok(hits)
    }

    /// Assemble analysis context for a claim's combined text. An empty query
    /// or an empty corpus yields empty context, not an error.
    pub async fn assemble(
        &self,
        query: &str,
        country: &str,
    ) -> Result<AssembledContext, PipelineError> {
        if query.trim().is_empty() {
            return Ok(AssembledContext::default());
        }

        let hits = self.search(query, country, None).await?;

        tracing::debug!(country = %country, hits = hits.len(), "Corpus retrieval complete");

        let budget = self.config.max_context_tokens * CHARS_PER_TOKEN;
        Ok(pack(&hits, budget))
    }
}

/// Pack ranked hits into the character budget, keeping rank order. A hit
/// that overflows the budget is truncated when a useful excerpt still fits;
/// otherwise packing stops.
fn pack(ranked: &[ScoredReference], max_chars: usize) -> AssembledContext {
    let mut text = String::new();
    let mut sources = Vec::new();

    for hit in ranked {
        let header = format!("[{} - {}]\n", hit.category, hit.filename);
        let separator = if text.is_empty() { "" } else { SOURCE_SEPARATOR };
        let overhead = separator.len() + header.len();

        let remaining = max_chars.saturating_sub(text.len() + overhead);

        let excerpt = if hit.text.len() <= remaining {
            hit.text.clone()
        } else if remaining >= MIN_EXCERPT_CHARS {
            let mut end = remaining.saturating_sub(3);
            while end > 0 && !hit.text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &hit.text[..end])
        } else {
            break;
        };

        text.push_str(separator);
        text.push_str(&header);
        text.push_str(&excerpt);
        sources.push(ContextSource {
            filename: hit.filename.clone(),
            category: hit.category.clone(),
            similarity: hit.similarity,
        });
    }

    AssembledContext { text, sources }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(filename: &str, category: &str, text: &str, similarity: f64) -> ScoredReference {
        ScoredReference {
            id: 1,
            filename: filename.to_string(),
            country: "ES".to_string(),
            category: category.to_string(),
            text: text.to_string(),
            similarity,
        }
    }

    #[test]
    fn test_pack_keeps_rank_order_and_headers() {
        let hits = vec![
            hit("a.pdf", "policy", "first text", 0.95),
            hit("b.pdf", "exclusions", "second text", 0.81),
        ];
        let packed = pack(&hits, 10_000);

        assert_eq!(
            packed.text,
            "[policy - a.pdf]\nfirst text\n\n---\n\n[exclusions - b.pdf]\nsecond text"
        );
        assert_eq!(packed.sources.len(), 2);
        assert_eq!(packed.sources[0].filename, "a.pdf");
        assert!(packed.sources[0].similarity > packed.sources[1].similarity);
    }

    #[test]
    fn test_pack_truncates_overflowing_hit() {
        let long = "x".repeat(5_000);
        let hits = vec![hit("a.pdf", "policy", &long, 0.9)];
        let packed = pack(&hits, 2_000);

        assert!(packed.text.ends_with("..."));
        assert!(packed.text.len() <= 2_000);
        assert_eq!(packed.sources.len(), 1);
    }

    #[test]
    fn test_pack_stops_when_no_useful_room_remains() {
        let filler = "y".repeat(1_900);
        let second = "z".repeat(600);
        let hits = vec![
            hit("a.pdf", "policy", &filler, 0.9),
            hit("b.pdf", "policy", &second, 0.8),
        ];
        // After the first hit fewer than MIN_EXCERPT_CHARS remain, so the
        // second is dropped rather than truncated to a useless stub.
        let packed = pack(&hits, 2_000);

        assert_eq!(packed.sources.len(), 1);
        assert!(!packed.text.contains("b.pdf"));
    }

    #[test]
    fn test_pack_empty_hits() {
        let packed = pack(&[], 2_000);
        assert!(packed.text.is_empty());
        assert!(packed.sources.is_empty());
    }
}
