//! Report artifact rendering

use chrono::Utc;
use serde_json::json;

use super::{ProviderError, ReportRenderer};
use crate::model::{Claim, ClaimAnalysis, ContextSource};

/// Renders the analysis report as a pretty-printed JSON document
pub struct JsonReportRenderer;

impl ReportRenderer for JsonReportRenderer {
    fn render(
        &self,
        claim: &Claim,
        analysis: &ClaimAnalysis,
        sources: &[ContextSource],
        model_used: &str,
        prompt_id: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let report = json!({
            "claim_id": claim.id,
            "country": claim.country,
            "contract_number": claim.contract_number,
            "generated_at": Utc::now().to_rfc3339(),
            "model_used": model_used,
            "prompt_id": prompt_id,
            "analysis": analysis,
            "context_sources": sources,
        });

        serde_json::to_vec_pretty(&report).map_err(|e| ProviderError::Parse(e.to_string()))
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClaimStatus, Recommendation};

    #[test]
    fn test_render_includes_verdict_and_sources() {
        let claim = Claim {
            id: 7,
            country: "ES".to_string(),
            status: ClaimStatus::Analyzing,
            contract_number: Some("C-42".to_string()),
            created_at: Utc::now(),
            analysis_result: None,
            analysis_model: None,
        };
        let analysis = ClaimAnalysis {
            recommendation: Recommendation::Investigate,
            confidence: 0.6,
            reasoning: "unclear coverage".to_string(),
            missing_info: vec!["police report".to_string()],
        };
        let sources = vec![ContextSource {
            filename: "policy.pdf".to_string(),
            category: "policy".to_string(),
            similarity: 0.91,
        }];

        let bytes = JsonReportRenderer
            .render(&claim, &analysis, &sources, "gpt-4o-mini", "default")
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["claim_id"], 7);
        assert_eq!(value["analysis"]["recommendation"], "INVESTIGATE");
        assert_eq!(value["context_sources"][0]["filename"], "policy.pdf");
        assert_eq!(value["prompt_id"], "default");
    }
}
