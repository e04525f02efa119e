//! Claim and claim-document domain models, plus the per-document stage
//! barrier that drives claim-level transitions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::ClaimStatus;

/// A batch of related documents processed as one unit.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Claim {
    pub id: i64,
    pub country: String,
    pub status: ClaimStatus,
    /// Contract number used by the legacy policy system, when known.
    pub contract_number: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Opaque structured analysis output; populated by the analysis stage.
    pub analysis_result: Option<serde_json::Value>,
    pub analysis_model: Option<String>,
}

/// One source file of a claim with its progressively populated text fields.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClaimDocument {
    pub id: i64,
    pub claim_id: i64,
    pub filename: String,
    pub storage_key: String,
    pub raw_text: Option<String>,
    pub cleaned_text: Option<String>,
    pub deidentified_text: Option<String>,
    pub extraction_reviewed_by: Option<String>,
    pub extraction_reviewed_at: Option<DateTime<Utc>>,
    pub deident_reviewed_by: Option<String>,
    pub deident_reviewed_at: Option<DateTime<Utc>>,
}

/// Rendered analysis artifact owned by a claim.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisReport {
    pub id: i64,
    pub claim_id: i64,
    pub storage_key: String,
    pub model_used: String,
    pub prompt_id: String,
    pub created_at: DateTime<Utc>,
}

/// The three per-document pipeline stages.
///
/// Each stage fills exactly one text field on [`ClaimDocument`]; the claim
/// leaves the stage only once every owned document has that field populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extraction,
    Cleaning,
    Deidentification,
}

impl PipelineStage {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Extraction => "extraction",
            PipelineStage::Cleaning => "cleaning",
            PipelineStage::Deidentification => "deidentification",
        }
    }

    /// Claim status while this stage's tasks are in flight.
    pub fn active_status(&self) -> ClaimStatus {
        match self {
            PipelineStage::Extraction => ClaimStatus::Processing,
            PipelineStage::Cleaning => ClaimStatus::Cleaning,
            PipelineStage::Deidentification => ClaimStatus::Deidentifying,
        }
    }

    /// Status the claim moves to once the barrier is satisfied.
    pub fn barrier_target(&self) -> ClaimStatus {
        match self {
            PipelineStage::Extraction => ClaimStatus::ExtractReview,
            PipelineStage::Cleaning => ClaimStatus::Deidentifying,
            PipelineStage::Deidentification => ClaimStatus::DeidentReview,
        }
    }

    /// The text field this stage populates.
    pub fn output_text<'a>(&self, doc: &'a ClaimDocument) -> Option<&'a str> {
        match self {
            PipelineStage::Extraction => doc.raw_text.as_deref(),
            PipelineStage::Cleaning => doc.cleaned_text.as_deref(),
            PipelineStage::Deidentification => doc.deidentified_text.as_deref(),
        }
    }

    /// The text field this stage consumes, if any.
    pub fn input_text<'a>(&self, doc: &'a ClaimDocument) -> Option<&'a str> {
        match self {
            PipelineStage::Extraction => None,
            PipelineStage::Cleaning => doc.raw_text.as_deref(),
            PipelineStage::Deidentification => doc.cleaned_text.as_deref(),
        }
    }

    /// Column the stage writes its output to.
    pub fn output_column(&self) -> &'static str {
        match self {
            PipelineStage::Extraction => "raw_text",
            PipelineStage::Cleaning => "cleaned_text",
            PipelineStage::Deidentification => "deidentified_text",
        }
    }

    /// Column holding the stage's input. Output writes are guarded on this
    /// column still being populated, so a job that raced an operator
    /// re-clean cannot attach output to a document whose input was nulled.
    pub fn input_column(&self) -> Option<&'static str> {
        match self {
            PipelineStage::Extraction => None,
            PipelineStage::Cleaning => Some("raw_text"),
            PipelineStage::Deidentification => Some("cleaned_text"),
        }
    }

    pub fn is_complete(&self, doc: &ClaimDocument) -> bool {
        self.output_text(doc).is_some()
    }

    /// The core synchronization barrier: true once every document of the
    /// claim has this stage's output field populated.
    pub fn barrier_satisfied(&self, docs: &[ClaimDocument]) -> bool {
        !docs.is_empty() && docs.iter().all(|d| self.is_complete(d))
    }
}

#[cfg(test)]
pub(crate) fn test_document(id: i64, claim_id: i64) -> ClaimDocument {
    ClaimDocument {
        id,
        claim_id,
        filename: format!("doc-{}.pdf", id),
        storage_key: format!("claims/{}/originals/doc-{}.pdf", claim_id, id),
        raw_text: None,
        cleaned_text: None,
        deidentified_text: None,
        extraction_reviewed_by: None,
        extraction_reviewed_at: None,
        deident_reviewed_by: None,
        deident_reviewed_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_requires_every_document() {
        let mut d1 = test_document(1, 10);
        let mut d2 = test_document(2, 10);

        let stage = PipelineStage::Extraction;
        assert!(!stage.barrier_satisfied(&[d1.clone(), d2.clone()]));

        d1.raw_text = Some("first".into());
        assert!(!stage.barrier_satisfied(&[d1.clone(), d2.clone()]));

        d2.raw_text = Some("second".into());
        assert!(stage.barrier_satisfied(&[d1, d2]));
    }

    #[test]
    fn test_barrier_order_independent() {
        // Completion order of sibling documents must not matter.
        let mut docs: Vec<ClaimDocument> = (0..4).map(|i| test_document(i, 7)).collect();
        for order in [[3usize, 0, 2, 1], [0, 1, 2, 3]] {
            for d in docs.iter_mut() {
                d.cleaned_text = None;
            }
            let stage = PipelineStage::Cleaning;
            for (n, &i) in order.iter().enumerate() {
                docs[i].cleaned_text = Some("text".into());
                let satisfied = stage.barrier_satisfied(&docs);
                assert_eq!(satisfied, n == order.len() - 1);
            }
        }
    }

    #[test]
    fn test_barrier_empty_claim_never_satisfied() {
        assert!(!PipelineStage::Extraction.barrier_satisfied(&[]));
    }

    #[test]
    fn test_stage_fields() {
        let mut doc = test_document(1, 1);
        doc.raw_text = Some("raw".into());
        doc.cleaned_text = Some("clean".into());

        assert_eq!(PipelineStage::Cleaning.input_text(&doc), Some("raw"));
        assert_eq!(PipelineStage::Cleaning.output_text(&doc), Some("clean"));
        assert_eq!(PipelineStage::Deidentification.input_text(&doc), Some("clean"));
        assert_eq!(PipelineStage::Deidentification.output_text(&doc), None);
        assert!(PipelineStage::Extraction.input_text(&doc).is_none());
    }

    #[test]
    fn test_stage_columns_chain() {
        assert_eq!(PipelineStage::Extraction.input_column(), None);
        // Each stage's write guard is the previous stage's output column,
        // so nulled inputs (re-clean) reject late output writes.
        assert_eq!(
            PipelineStage::Cleaning.input_column(),
            Some(PipelineStage::Extraction.output_column())
        );
        assert_eq!(
            PipelineStage::Deidentification.input_column(),
            Some(PipelineStage::Cleaning.output_column())
        );
        assert_eq!(
            PipelineStage::Deidentification.output_column(),
            "deidentified_text"
        );
    }

    #[test]
    fn test_stage_status_mapping() {
        assert_eq!(
            PipelineStage::Extraction.active_status(),
            ClaimStatus::Processing
        );
        assert_eq!(
            PipelineStage::Extraction.barrier_target(),
            ClaimStatus::ExtractReview
        );
        assert_eq!(
            PipelineStage::Cleaning.barrier_target(),
            ClaimStatus::Deidentifying
        );
        assert_eq!(
            PipelineStage::Deidentification.barrier_target(),
            ClaimStatus::DeidentReview
        );
        // Each barrier move must be in the transition table.
        for stage in [
            PipelineStage::Extraction,
            PipelineStage::Cleaning,
            PipelineStage::Deidentification,
        ] {
            assert!(stage.active_status().can_transition(stage.barrier_target()));
        }
    }
}
