//! Audit trail domain model: the closed action taxonomy and entry shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Closed taxonomy of auditable actions. Free-text actions are not accepted;
/// new kinds of state change require a new variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ClaimCreated,
    ClaimDeleted,
    ClaimStatusChanged,
    ExtractionEdited,
    ExtractionApproved,
    CleaningCompleted,
    CleaningRetry,
    DeidentificationEdited,
    DeidentificationApproved,
    DeidentificationRetry,
    ReClean,
    StatusReset,
    AnalysisStarted,
    AnalysisCompleted,
    ReportGenerated,
    ReferenceUploaded,
    ReferenceDeleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ClaimCreated => "CLAIM_CREATED",
            AuditAction::ClaimDeleted => "CLAIM_DELETED",
            AuditAction::ClaimStatusChanged => "CLAIM_STATUS_CHANGED",
            AuditAction::ExtractionEdited => "EXTRACTION_EDITED",
            AuditAction::ExtractionApproved => "EXTRACTION_APPROVED",
            AuditAction::CleaningCompleted => "CLEANING_COMPLETED",
            AuditAction::CleaningRetry => "CLEANING_RETRY",
            AuditAction::DeidentificationEdited => "DEIDENTIFICATION_EDITED",
            AuditAction::DeidentificationApproved => "DEIDENTIFICATION_APPROVED",
            AuditAction::DeidentificationRetry => "DEIDENTIFICATION_RETRY",
            AuditAction::ReClean => "RE_CLEAN",
            AuditAction::StatusReset => "STATUS_RESET",
            AuditAction::AnalysisStarted => "ANALYSIS_STARTED",
            AuditAction::AnalysisCompleted => "ANALYSIS_COMPLETED",
            AuditAction::ReportGenerated => "REPORT_GENERATED",
            AuditAction::ReferenceUploaded => "REFERENCE_UPLOADED",
            AuditAction::ReferenceDeleted => "REFERENCE_DELETED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLAIM_CREATED" => Ok(AuditAction::ClaimCreated),
            "CLAIM_DELETED" => Ok(AuditAction::ClaimDeleted),
            "CLAIM_STATUS_CHANGED" => Ok(AuditAction::ClaimStatusChanged),
            "EXTRACTION_EDITED" => Ok(AuditAction::ExtractionEdited),
            "EXTRACTION_APPROVED" => Ok(AuditAction::ExtractionApproved),
            "CLEANING_COMPLETED" => Ok(AuditAction::CleaningCompleted),
            "CLEANING_RETRY" => Ok(AuditAction::CleaningRetry),
            "DEIDENTIFICATION_EDITED" => Ok(AuditAction::DeidentificationEdited),
            "DEIDENTIFICATION_APPROVED" => Ok(AuditAction::DeidentificationApproved),
            "DEIDENTIFICATION_RETRY" => Ok(AuditAction::DeidentificationRetry),
            "RE_CLEAN" => Ok(AuditAction::ReClean),
            "STATUS_RESET" => Ok(AuditAction::StatusReset),
            "ANALYSIS_STARTED" => Ok(AuditAction::AnalysisStarted),
            "ANALYSIS_COMPLETED" => Ok(AuditAction::AnalysisCompleted),
            "REPORT_GENERATED" => Ok(AuditAction::ReportGenerated),
            "REFERENCE_UPLOADED" => Ok(AuditAction::ReferenceUploaded),
            "REFERENCE_DELETED" => Ok(AuditAction::ReferenceDeleted),
            other => Err(format!("unknown audit action: {}", other)),
        }
    }
}

/// Entity kinds an audit entry can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEntityType {
    Claim,
    ClaimDocument,
    ReferenceDocument,
}

impl AuditEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntityType::Claim => "CLAIM",
            AuditEntityType::ClaimDocument => "CLAIM_DOCUMENT",
            AuditEntityType::ReferenceDocument => "REFERENCE_DOCUMENT",
        }
    }
}

impl fmt::Display for AuditEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditEntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLAIM" => Ok(AuditEntityType::Claim),
            "CLAIM_DOCUMENT" => Ok(AuditEntityType::ClaimDocument),
            "REFERENCE_DOCUMENT" => Ok(AuditEntityType::ReferenceDocument),
            other => Err(format!("unknown audit entity type: {}", other)),
        }
    }
}

/// One immutable audit trail record. Never updated or deleted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditEntry {
    pub id: i64,
    pub actor: String,
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: i64,
    pub changes: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Structured change payload for text edits. Long texts are truncated so the
/// trail records the shape of the edit without duplicating whole documents.
pub fn text_edit_changes(old: &str, new: &str) -> serde_json::Value {
    const EXCERPT: usize = 500;
    serde_json::json!({
        "old_value": truncate_chars(old, EXCERPT),
        "new_value": truncate_chars(new, EXCERPT),
        "changed_length": new.chars().count() as i64 - old.chars().count() as i64,
    })
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ACTIONS: [AuditAction; 17] = [
        AuditAction::ClaimCreated,
        AuditAction::ClaimDeleted,
        AuditAction::ClaimStatusChanged,
        AuditAction::ExtractionEdited,
        AuditAction::ExtractionApproved,
        AuditAction::CleaningCompleted,
        AuditAction::CleaningRetry,
        AuditAction::DeidentificationEdited,
        AuditAction::DeidentificationApproved,
        AuditAction::DeidentificationRetry,
        AuditAction::ReClean,
        AuditAction::StatusReset,
        AuditAction::AnalysisStarted,
        AuditAction::AnalysisCompleted,
        AuditAction::ReportGenerated,
        AuditAction::ReferenceUploaded,
        AuditAction::ReferenceDeleted,
    ];

    #[test]
    fn test_action_round_trip() {
        for action in ALL_ACTIONS {
            assert_eq!(action.as_str().parse::<AuditAction>(), Ok(action));
        }
        assert!("SOMETHING_ELSE".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_entity_type_round_trip() {
        for t in [
            AuditEntityType::Claim,
            AuditEntityType::ClaimDocument,
            AuditEntityType::ReferenceDocument,
        ] {
            assert_eq!(t.as_str().parse::<AuditEntityType>(), Ok(t));
        }
    }

    #[test]
    fn test_text_edit_changes_truncates() {
        let old = "a".repeat(2000);
        let changes = text_edit_changes(&old, "short");
        assert_eq!(changes["old_value"].as_str().map(|s| s.len()), Some(500));
        assert_eq!(changes["new_value"], "short");
        assert_eq!(changes["changed_length"], -1995);
    }
}
