//! Claim lifecycle states and the transition table between them.
//!
//! Every status change in the pipeline is validated against the table in
//! [`ClaimStatus::can_transition`]; the two administrative operations (reset,
//! re-clean) are the only ways around it and carry their own preconditions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Lifecycle state of a claim.
///
/// `WaitingForApproval` and `Approved` predate the staged pipeline and are
/// kept so old rows still deserialize; no new upload can reach them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Processing,
    ExtractReview,
    Cleaning,
    Deidentifying,
    DeidentReview,
    ReadyForAnalysis,
    Analyzing,
    Analyzed,
    Failed,
    WaitingForApproval,
    Approved,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Processing => "PROCESSING",
            ClaimStatus::ExtractReview => "EXTRACT_REVIEW",
            ClaimStatus::Cleaning => "CLEANING",
            ClaimStatus::Deidentifying => "DEIDENTIFYING",
            ClaimStatus::DeidentReview => "DEIDENT_REVIEW",
            ClaimStatus::ReadyForAnalysis => "READY_FOR_ANALYSIS",
            ClaimStatus::Analyzing => "ANALYZING",
            ClaimStatus::Analyzed => "ANALYZED",
            ClaimStatus::Failed => "FAILED",
            ClaimStatus::WaitingForApproval => "WAITING_FOR_APPROVAL",
            ClaimStatus::Approved => "APPROVED",
        }
    }

    /// Whether `self -> to` is a transition of the normal pipeline graph.
    ///
    /// Barrier- and gate-triggered moves are listed explicitly; any stage
    /// that runs external work may also fail into `Failed`. Administrative
    /// reset and re-clean are deliberately NOT part of this table.
    pub fn can_transition(&self, to: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (*self, to),
            (Processing, ExtractReview)
                | (ExtractReview, Cleaning)
                | (Cleaning, Deidentifying)
                | (Deidentifying, DeidentReview)
                | (DeidentReview, ReadyForAnalysis)
                | (ReadyForAnalysis, Analyzing)
                | (Analyzing, Analyzed)
                | (Processing, Failed)
                | (Cleaning, Failed)
                | (Deidentifying, Failed)
                | (Analyzing, Failed)
        )
    }

    /// Source states from which the administrative reset is allowed.
    /// Reset always lands on `ReadyForAnalysis`.
    pub fn can_reset(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Analyzing | ClaimStatus::Failed | ClaimStatus::Analyzed
        )
    }

    /// States eligible for the operator-invoked differential retry.
    pub fn can_retry(&self) -> bool {
        matches!(self, ClaimStatus::Cleaning | ClaimStatus::Deidentifying)
    }

    pub fn is_legacy(&self) -> bool {
        matches!(
            self,
            ClaimStatus::WaitingForApproval | ClaimStatus::Approved
        )
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(ClaimStatus::Processing),
            "EXTRACT_REVIEW" => Ok(ClaimStatus::ExtractReview),
            "CLEANING" => Ok(ClaimStatus::Cleaning),
            "DEIDENTIFYING" => Ok(ClaimStatus::Deidentifying),
            "DEIDENT_REVIEW" => Ok(ClaimStatus::DeidentReview),
            "READY_FOR_ANALYSIS" => Ok(ClaimStatus::ReadyForAnalysis),
            "ANALYZING" => Ok(ClaimStatus::Analyzing),
            "ANALYZED" => Ok(ClaimStatus::Analyzed),
            "FAILED" => Ok(ClaimStatus::Failed),
            "WAITING_FOR_APPROVAL" => Ok(ClaimStatus::WaitingForApproval),
            "APPROVED" => Ok(ClaimStatus::Approved),
            other => Err(format!("unknown claim status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ClaimStatus::*;

    const ALL: [ClaimStatus; 11] = [
        Processing,
        ExtractReview,
        Cleaning,
        Deidentifying,
        DeidentReview,
        ReadyForAnalysis,
        Analyzing,
        Analyzed,
        Failed,
        WaitingForApproval,
        Approved,
    ];

    #[test]
    fn test_pipeline_path_is_accepted() {
        let path = [
            Processing,
            ExtractReview,
            Cleaning,
            Deidentifying,
            DeidentReview,
            ReadyForAnalysis,
            Analyzing,
            Analyzed,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition(pair[1]),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_stage_states_can_fail() {
        for from in [Processing, Cleaning, Deidentifying, Analyzing] {
            assert!(from.can_transition(Failed));
        }
        // Review gates and terminal states never fail on their own
        for from in [ExtractReview, DeidentReview, ReadyForAnalysis, Analyzed, Failed] {
            assert!(!from.can_transition(Failed));
        }
    }

    #[test]
    fn test_no_backward_or_skipping_transitions() {
        assert!(!ExtractReview.can_transition(Processing));
        assert!(!Processing.can_transition(Cleaning));
        assert!(!Cleaning.can_transition(DeidentReview));
        assert!(!Analyzed.can_transition(Analyzing));
        assert!(!Failed.can_transition(ReadyForAnalysis));
    }

    #[test]
    fn test_legacy_states_unreachable() {
        for from in ALL {
            assert!(!from.can_transition(WaitingForApproval));
            assert!(!from.can_transition(Approved));
        }
        assert!(WaitingForApproval.is_legacy());
        assert!(Approved.is_legacy());
        assert!(!Processing.is_legacy());
    }

    #[test]
    fn test_reset_sources() {
        for s in ALL {
            let expected = matches!(s, Analyzing | Failed | Analyzed);
            assert_eq!(s.can_reset(), expected, "reset from {}", s);
        }
    }

    #[test]
    fn test_retry_sources() {
        for s in ALL {
            let expected = matches!(s, Cleaning | Deidentifying);
            assert_eq!(s.can_retry(), expected, "retry from {}", s);
        }
    }

    #[test]
    fn test_string_round_trip() {
        for s in ALL {
            assert_eq!(s.as_str().parse::<ClaimStatus>(), Ok(s));
        }
        assert!("NOT_A_STATUS".parse::<ClaimStatus>().is_err());
    }
}
