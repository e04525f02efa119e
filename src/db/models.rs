//! Database row types and query parameter structs

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::model::{
    AnalysisReport, AuditEntry, Claim, ClaimDocument, ClaimStatus, ReferenceDocument,
    ScoredReference,
};

/// Database representation of a claim
#[derive(Debug, Clone, FromRow)]
pub struct ClaimRow {
    pub id: i64,
    pub country: String,
    pub status: String,
    pub contract_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub analysis_result: Option<serde_json::Value>,
    pub analysis_model: Option<String>,
}

impl ClaimRow {
    /// Convert database row to domain model. An unknown status string is a
    /// consistency defect, not something to silently coerce.
    pub fn into_domain(self) -> Result<Claim, String> {
        let status: ClaimStatus = self.status.parse()?;
        Ok(Claim {
            id: self.id,
            country: self.country,
            status,
            contract_number: self.contract_number,
            created_at: self.created_at,
            analysis_result: self.analysis_result,
            analysis_model: self.analysis_model,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ClaimDocumentRow {
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

impl ClaimDocumentRow {
    pub fn into_domain(self) -> ClaimDocument {
        ClaimDocument {
            id: self.id,
            claim_id: self.claim_id,
            filename: self.filename,
            storage_key: self.storage_key,
            raw_text: self.raw_text,
            cleaned_text: self.cleaned_text,
            deidentified_text: self.deidentified_text,
            extraction_reviewed_by: self.extraction_reviewed_by,
            extraction_reviewed_at: self.extraction_reviewed_at,
            deident_reviewed_by: self.deident_reviewed_by,
            deident_reviewed_at: self.deident_reviewed_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AnalysisReportRow {
    pub id: i64,
    pub claim_id: i64,
    pub storage_key: String,
    pub model_used: String,
    pub prompt_id: String,
    pub created_at: DateTime<Utc>,
}

impl AnalysisReportRow {
    pub fn into_domain(self) -> AnalysisReport {
        AnalysisReport {
            id: self.id,
            claim_id: self.claim_id,
            storage_key: self.storage_key,
            model_used: self.model_used,
            prompt_id: self.prompt_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AuditLogRow {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub changes: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogRow {
    pub fn into_domain(self) -> Result<AuditEntry, String> {
        Ok(AuditEntry {
            id: self.id,
            actor: self.actor,
            action: self.action.parse()?,
            entity_type: self.entity_type.parse()?,
            entity_id: self.entity_id,
            changes: self.changes,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ReferenceDocumentRow {
    pub id: i64,
    pub filename: String,
    pub storage_key: String,
    pub country: String,
    pub category: String,
    pub extracted_text: Option<String>,
    pub has_embedding: bool,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

impl ReferenceDocumentRow {
    pub fn into_domain(self) -> ReferenceDocument {
        ReferenceDocument {
            id: self.id,
            filename: self.filename,
            storage_key: self.storage_key,
            country: self.country,
            category: self.category,
            extracted_text: self.extracted_text,
            has_embedding: self.has_embedding,
            uploaded_by: self.uploaded_by,
            created_at: self.created_at,
        }
    }
}

/// Similarity search hit for a reference document
#[derive(Debug, Clone, FromRow)]
pub struct ScoredReferenceRow {
    pub id: i64,
    pub filename: String,
    pub country: String,
    pub category: String,
    pub extracted_text: Option<String>,
    pub similarity: f64,
}

impl ScoredReferenceRow {
    pub fn into_domain(self) -> ScoredReference {
        ScoredReference {
            id: self.id,
            filename: self.filename,
            country: self.country,
            category: self.category,
            text: self.extracted_text.unwrap_or_default(),
            similarity: self.similarity,
        }
    }
}

/// Filters for listing claims
#[derive(Debug, Clone, Default)]
pub struct ListClaimsQuery {
    pub status: Option<ClaimStatus>,
    pub country: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Filters for listing audit entries
#[derive(Debug, Clone, Default)]
pub struct ListAuditQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub actor: Option<String>,
    pub action: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Filters for listing reference documents
#[derive(Debug, Clone, Default)]
pub struct ListCorpusQuery {
    pub country: Option<String>,
    pub category: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
