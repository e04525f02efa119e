//! Claim lifecycle service: intake, review gates, analysis trigger and
//! report access.
//!
//! Review gate operations validate the claim's current status before
//! touching anything; the verbatim status goes into the error message so
//! the operator sees what state the claim is actually in.

use futures::future::join_all;
use sqlx::PgPool;
use std::sync::Arc;

use crate::db::claims::{ClaimRepository, PaginatedClaims};
use crate::db::models::ListClaimsQuery;
use crate::model::{
    text_edit_changes, AnalysisReport, AuditAction, AuditEntityType, Claim, ClaimDocument,
    ClaimStatus, Config,
};
use crate::provider::BlobStore;
use crate::service::audit::AuditRecorder;
use crate::service::error::PipelineError;
use crate::service::queue::{Job, JobQueue};

/// One file submitted with a new claim
pub struct NewClaimDocument {
    pub filename: String,
    pub content: Vec<u8>,
}

pub struct ClaimService {
    pool: PgPool,
    claims: ClaimRepository,
    audit: AuditRecorder,
    queue: JobQueue,
    blob: Arc<dyn BlobStore>,
    config: Config,
}

impl ClaimService {
    pub fn new(
        pool: PgPool,
        claims: ClaimRepository,
        audit: AuditRecorder,
        queue: JobQueue,
        blob: Arc<dyn BlobStore>,
        config: Config,
    ) -> Self {
        Self {
            pool,
            claims,
            audit,
            queue,
            blob,
            config,
        }
    }

    /// Create a claim from its uploaded documents and start extraction
    pub async fn create(
        &self,
        country: &str,
        contract_number: Option<&str>,
        files: Vec<NewClaimDocument>,
        actor: &str,
    ) -> Result<(Claim, Vec<ClaimDocument>), PipelineError> {
        if country.trim().is_empty() {
            return Err(PipelineError::Validation("country is required".to_string()));
        }
        if files.is_empty() {
            return Err(PipelineError::Validation(
                "at least one document is required".to_string(),
            ));
        }

        // One transaction spans the claim row, its documents and the audit
        // entry; a failed blob upload before commit rolls the claim back
        // instead of stranding a documentless claim in PROCESSING.
        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        let claim = self
            .claims
            .insert_claim(&mut tx, country, contract_number)
            .await?;

        let keyed: Vec<(String, String, Vec<u8>)> = files
            .into_iter()
            .map(|f| {
                let safe_name = sanitize_filename(&f.filename);
                let key = format!("claims/{}/originals/{}", claim.id, safe_name);
                (safe_name, key, f.content)
            })
            .collect();

        let uploads = keyed
            .iter()
            .map(|(_, key, content)| self.blob.put(key, content));
        for result in join_all(uploads).await {
            result?;
        }

        let mut docs = Vec::with_capacity(keyed.len());
        for (filename, key, _) in &keyed {
            let doc = self
                .claims
                .insert_document(&mut tx, claim.id, filename, key)
                .await?;
            docs.push(doc);
        }

        let changes = serde_json::json!({
            "country": country,
            "num_documents": docs.len(),
        });
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::ClaimCreated,
                AuditEntityType::Claim,
                claim.id,
                Some(&changes),
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        for doc in &docs {
            self.queue.dispatch(Job::ExtractDocument { document_id: doc.id });
        }

        tracing::info!(
            claim_id = claim.id,
            country = %country,
            documents = docs.len(),
            "Claim created"
        );

        Ok((claim, docs))
    }

    pub async fn get(&self, claim_id: i64) -> Result<(Claim, Vec<ClaimDocument>), PipelineError> {
        let claim = self.claims.get_claim(claim_id).await?;
        let docs = self.claims.documents(claim_id).await?;
        Ok((claim, docs))
    }

    pub async fn list(&self, query: ListClaimsQuery) -> Result<PaginatedClaims, PipelineError> {
        Ok(self.claims.list(query).await?)
    }

    /// Delete a claim; documents and reports cascade in the database.
    /// Stored blobs are left behind for out-of-band cleanup.
    pub async fn delete(&self, claim_id: i64, actor: &str) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        let deleted = self.claims.delete_claim(&mut tx, claim_id).await?;
        if !deleted {
            return Err(PipelineError::NotFound(format!("claim {}", claim_id)));
        }
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::ClaimDeleted,
                AuditEntityType::Claim,
                claim_id,
                None,
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        tracing::info!(claim_id, "Claim deleted");
        Ok(())
    }

    /// Overwrite one document's extracted text during extraction review
    pub async fn edit_extraction(
        &self,
        claim_id: i64,
        document_id: i64,
        text: &str,
        actor: &str,
    ) -> Result<(), PipelineError> {
        let doc = self
            .document_in_status(claim_id, document_id, ClaimStatus::ExtractReview)
            .await?;

        let old = doc.raw_text.as_deref().unwrap_or_default();
        let changes = text_edit_changes(old, text);

        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        self.claims
            .update_raw_text_reviewed(&mut tx, document_id, text, actor)
            .await?;
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::ExtractionEdited,
                AuditEntityType::ClaimDocument,
                document_id,
                Some(&changes),
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        Ok(())
    }

    /// Approve extraction for the whole claim and start cleaning
    pub async fn approve_extraction(
        &self,
        claim_id: i64,
        actor: &str,
    ) -> Result<ClaimStatus, PipelineError> {
        let claim = self.claim_in_status(claim_id, ClaimStatus::ExtractReview).await?;

        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        self.claims
            .stamp_extraction_review(&mut tx, claim_id, actor)
            .await?;
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::ExtractionApproved,
                AuditEntityType::Claim,
                claim_id,
                None,
            )
            .await?;
        let won = self
            .claims
            .transition(&mut tx, claim_id, claim.status, ClaimStatus::Cleaning)
            .await?;
        if !won {
            return Err(PipelineError::Validation(format!(
                "claim not in EXTRACT_REVIEW status (current: {})",
                self.claims.get_claim(claim_id).await?.status
            )));
        }
        self.audit
            .record_status_change(&mut tx, actor, claim_id, claim.status, ClaimStatus::Cleaning)
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        let docs = self.claims.documents(claim_id).await?;
        for doc in &docs {
            self.queue.dispatch(Job::CleanDocument { document_id: doc.id });
        }

        tracing::info!(claim_id, "Extraction approved, cleaning started");
        Ok(ClaimStatus::Cleaning)
    }

    /// Overwrite one document's de-identified text during the final review
    pub async fn edit_deidentified(
        &self,
        claim_id: i64,
        document_id: i64,
        text: &str,
        actor: &str,
    ) -> Result<(), PipelineError> {
        let doc = self
            .document_in_status(claim_id, document_id, ClaimStatus::DeidentReview)
            .await?;

        if doc.cleaned_text.is_none() {
            return Err(PipelineError::Validation(format!(
                "document {} has not been cleaned yet",
                document_id
            )));
        }

        let old = doc.deidentified_text.as_deref().unwrap_or_default();
        let changes = text_edit_changes(old, text);

        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        self.claims
            .update_deidentified_text_reviewed(&mut tx, document_id, text, actor)
            .await?;
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::DeidentificationEdited,
                AuditEntityType::ClaimDocument,
                document_id,
                Some(&changes),
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        Ok(())
    }

    /// Approve de-identification, making the claim ready for analysis
    pub async fn approve_deidentification(
        &self,
        claim_id: i64,
        actor: &str,
    ) -> Result<ClaimStatus, PipelineError> {
        let claim = self.claim_in_status(claim_id, ClaimStatus::DeidentReview).await?;

        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        self.claims
            .stamp_deident_review(&mut tx, claim_id, actor)
            .await?;
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::DeidentificationApproved,
                AuditEntityType::Claim,
                claim_id,
                None,
            )
            .await?;
        let won = self
            .claims
            .transition(
                &mut tx,
                claim_id,
                claim.status,
                ClaimStatus::ReadyForAnalysis,
            )
            .await?;
        if !won {
            return Err(PipelineError::Validation(format!(
                "claim not in DEIDENT_REVIEW status (current: {})",
                self.claims.get_claim(claim_id).await?.status
            )));
        }
        self.audit
            .record_status_change(
                &mut tx,
                actor,
                claim_id,
                claim.status,
                ClaimStatus::ReadyForAnalysis,
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        tracing::info!(claim_id, "De-identification approved, claim ready for analysis");
        Ok(ClaimStatus::ReadyForAnalysis)
    }

    /// Queue analysis for a claim that passed both review gates
    pub async fn trigger_analysis(
        &self,
        claim_id: i64,
        prompt_id: &str,
        actor: &str,
    ) -> Result<(), PipelineError> {
        let claim = self.claims.get_claim(claim_id).await?;

        if claim.status != ClaimStatus::ReadyForAnalysis {
            return Err(PipelineError::Validation(format!(
                "claim not in READY_FOR_ANALYSIS status (current: {})",
                claim.status
            )));
        }
        if self.config.prompt_template(prompt_id).is_none() {
            return Err(PipelineError::Validation(format!(
                "unknown prompt template: {}",
                prompt_id
            )));
        }

        self.queue.dispatch(Job::AnalyzeClaim {
            claim_id,
            prompt_id: prompt_id.to_string(),
            actor: actor.to_string(),
        });

        tracing::info!(claim_id, prompt_id, "Analysis queued");
        Ok(())
    }

    /// Reports for a claim, newest first, each with a download URL
    pub async fn reports(
        &self,
        claim_id: i64,
    ) -> Result<Vec<(AnalysisReport, String)>, PipelineError> {
        // Surface a 404 for unknown claims instead of an empty list
        self.claims.get_claim(claim_id).await?;

        let reports = self.claims.list_reports(claim_id).await?;
        let mut out = Vec::with_capacity(reports.len());
        for report in reports {
            let url = self.blob.presign(&report.storage_key).await?;
            out.push((report, url));
        }
        Ok(out)
    }

    async fn claim_in_status(
        &self,
        claim_id: i64,
        expected: ClaimStatus,
    ) -> Result<Claim, PipelineError> {
        let claim = self.claims.get_claim(claim_id).await?;
        if claim.status != expected {
            return Err(PipelineError::Validation(format!(
                "claim not in {} status (current: {})",
                expected, claim.status
            )));
        }
        Ok(claim)
    }

    async fn document_in_status(
        &self,
        claim_id: i64,
        document_id: i64,
        expected: ClaimStatus,
    ) -> Result<ClaimDocument, PipelineError> {
        self.claim_in_status(claim_id, expected).await?;

        let doc = self.claims.get_document(document_id).await?;
        if doc.claim_id != claim_id {
            return Err(PipelineError::NotFound(format!(
                "document {} of claim {}",
                document_id, claim_id
            )));
        }
        Ok(doc)
    }
}

/// Keep only the final path component and drop characters that would break
/// storage keys.
fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_paths() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\claim.pdf"), "claim.pdf");
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename(""), "unnamed");
    }
}
