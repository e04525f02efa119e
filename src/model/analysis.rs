//! LLM-extractable analysis output for a claim.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Adjuster recommendation for a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    Reject,
    Investigate,
}

/// Structured analysis result extracted from the analysis provider.
///
/// Persisted opaquely on the claim as JSON; the pipeline only inspects
/// `recommendation` and `confidence` for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClaimAnalysis {
    pub recommendation: Recommendation,
    /// Confidence score between 0.0 and 1.0.
    pub confidence: f64,
    /// Explanation of the decision citing the grounding policy excerpts.
    pub reasoning: String,
    /// Information the adjuster should request before deciding, if any.
    #[serde(default)]
    pub missing_info: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_provider_output() {
        let raw = serde_json::json!({
            "recommendation": "INVESTIGATE",
            "confidence": 0.65,
            "reasoning": "Coverage clause 4.2 is ambiguous for this treatment.",
            "missing_info": ["discharge summary"]
        });
        let analysis: ClaimAnalysis = serde_json::from_value(raw).unwrap();
        assert_eq!(analysis.recommendation, Recommendation::Investigate);
        assert_eq!(analysis.missing_info.len(), 1);
    }

    #[test]
    fn test_missing_info_defaults_to_empty() {
        let raw = serde_json::json!({
            "recommendation": "APPROVE",
            "confidence": 0.9,
            "reasoning": "Within policy limits."
        });
        let analysis: ClaimAnalysis = serde_json::from_value(raw).unwrap();
        assert!(analysis.missing_info.is_empty());
    }
}
