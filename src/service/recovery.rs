//! Recovery operations for failed or stuck claims
//!
//! Retry re-runs only the documents missing the current stage's output.
//! Reset moves an analyzed or failed claim back to READY_FOR_ANALYSIS
//! without touching document text. Re-clean wipes all derived text and
//! restarts the pipeline from cleaning.

use sqlx::PgPool;

use crate::db::claims::ClaimRepository;
use crate::model::{
    AuditAction, AuditEntityType, ClaimDocument, ClaimStatus, PipelineStage,
};
use crate::service::audit::AuditRecorder;
use crate::service::error::PipelineError;
use crate::service::queue::{Job, JobQueue};

/// Result of a retry request
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub status: ClaimStatus,
    pub retried: usize,
}

pub struct RecoveryService {
    pool: PgPool,
    claims: ClaimRepository,
    audit: AuditRecorder,
    queue: JobQueue,
}

impl RecoveryService {
    pub fn new(
        pool: PgPool,
        claims: ClaimRepository,
        audit: AuditRecorder,
        queue: JobQueue,
    ) -> Self {
        Self {
            pool,
            claims,
            audit,
            queue,
        }
    }

    /// Re-dispatch stage jobs for the documents that never produced output.
    /// Documents that already completed the stage are left untouched.
    pub async fn retry(&self, claim_id: i64, actor: &str) -> Result<RetryOutcome, PipelineError> {
        let claim = self.claims.get_claim(claim_id).await?;

        if !claim.status.can_retry() {
            return Err(PipelineError::Validation(format!(
                "claim not in CLEANING or DEIDENTIFYING status (current: {})",
                claim.status
            )));
        }

        let stage = match claim.status {
            ClaimStatus::Cleaning => PipelineStage::Cleaning,
            ClaimStatus::Deidentifying => PipelineStage::Deidentification,
            _ => unreachable!("can_retry admits only CLEANING and DEIDENTIFYING"),
        };

        let docs = self.claims.documents(claim_id).await?;
        let candidates = retry_candidates(stage, &docs);

        if candidates.is_empty() {
            tracing::info!(claim_id, stage = stage.name(), "Nothing to retry");
            return Ok(RetryOutcome {
                status: claim.status,
                retried: 0,
            });
        }

        let retry_action = match stage {
            PipelineStage::Cleaning => AuditAction::CleaningRetry,
            PipelineStage::Deidentification => AuditAction::DeidentificationRetry,
            PipelineStage::Extraction => unreachable!(),
        };

        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        for &doc_id in &candidates {
            self.audit
                .record(
                    &mut tx,
                    actor,
                    retry_action,
                    AuditEntityType::ClaimDocument,
                    doc_id,
                    None,
                )
                .await?;
        }
        tx.commit().await.map_err(crate::db::DbError::from)?;

        for &doc_id in &candidates {
            let job = match stage {
                PipelineStage::Cleaning => Job::CleanDocument { document_id: doc_id },
                PipelineStage::Deidentification => Job::DeidentifyDocument {
                    document_id: doc_id,
                    country: claim.country.clone(),
                },
                PipelineStage::Extraction => unreachable!(),
            };
            self.queue.dispatch(job);
        }

        tracing::info!(
            claim_id,
            stage = stage.name(),
            retried = candidates.len(),
            "Retry dispatched"
        );

        Ok(RetryOutcome {
            status: claim.status,
            retried: candidates.len(),
        })
    }

    /// Move a finished or failed claim back to READY_FOR_ANALYSIS so it can
    /// be analyzed again, keeping all document text as-is.
    pub async fn reset(&self, claim_id: i64, actor: &str) -> Result<ClaimStatus, PipelineError> {
        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;

        let claim = self.claims.get_claim_for_update(&mut tx, claim_id).await?;
        if !claim.status.can_reset() {
            return Err(PipelineError::Validation(format!(
                "claim cannot be reset from status {}",
                claim.status
            )));
        }

        self.claims
            .transition(&mut tx, claim_id, claim.status, ClaimStatus::ReadyForAnalysis)
            .await?;

        let changes = serde_json::json!({
            "old_value": claim.status.as_str(),
            "new_value": ClaimStatus::ReadyForAnalysis.as_str(),
        });
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::StatusReset,
                AuditEntityType::Claim,
                claim_id,
                Some(&changes),
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        tracing::info!(claim_id, from = claim.status.as_str(), "Claim reset");
        Ok(ClaimStatus::ReadyForAnalysis)
    }

    /// Wipe cleaned and de-identified text on every document and restart
    /// the pipeline from cleaning. Allowed from any status.
    pub async fn re_clean(&self, claim_id: i64, actor: &str) -> Result<ClaimStatus, PipelineError> {
        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;

        let claim = self.claims.get_claim_for_update(&mut tx, claim_id).await?;

        self.claims.clear_derived_texts(&mut tx, claim_id).await?;
        self.claims
            .force_status(&mut tx, claim_id, ClaimStatus::Cleaning)
            .await?;

        let changes = serde_json::json!({
            "old_value": claim.status.as_str(),
            "new_value": ClaimStatus::Cleaning.as_str(),
        });
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::ReClean,
                AuditEntityType::Claim,
                claim_id,
                Some(&changes),
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        let docs = self.claims.documents(claim_id).await?;
        for doc in &docs {
            self.queue.dispatch(Job::CleanDocument { document_id: doc.id });
        }

        tracing::info!(claim_id, documents = docs.len(), "Re-clean dispatched");
        Ok(ClaimStatus::Cleaning)
    }
}

/// Documents eligible for retry: the stage input exists but the output
/// never arrived. Documents that completed the stage are excluded, which
/// is what makes retry differential.
pub fn retry_candidates(stage: PipelineStage, docs: &[ClaimDocument]) -> Vec<i64> {
    docs.iter()
        .filter(|d| stage.input_text(d).is_some() && !stage.is_complete(d))
        .map(|d| d.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_document;

    #[test]
    fn test_retry_candidates_differential_cleaning() {
        let mut d1 = test_document(1, 9);
        let mut d2 = test_document(2, 9);
        let mut d3 = test_document(3, 9);
        // d1 finished cleaning, d2 stalled, d3 never even extracted
        d1.raw_text = Some("raw".into());
        d1.cleaned_text = Some("clean".into());
        d2.raw_text = Some("raw".into());
        d3.raw_text = None;

        let candidates = retry_candidates(PipelineStage::Cleaning, &[d1, d2, d3]);
        assert_eq!(candidates, vec![2]);
    }

    #[test]
    fn test_retry_candidates_differential_deidentification() {
        let mut d1 = test_document(1, 9);
        let mut d2 = test_document(2, 9);
        d1.cleaned_text = Some("clean".into());
        d1.deidentified_text = Some("deident".into());
        d2.cleaned_text = Some("clean".into());

        let candidates = retry_candidates(PipelineStage::Deidentification, &[d1, d2]);
        assert_eq!(candidates, vec![2]);
    }

    #[test]
    fn test_retry_candidates_empty_when_all_complete() {
        let mut d1 = test_document(1, 9);
        d1.raw_text = Some("raw".into());
        d1.cleaned_text = Some("clean".into());

        assert!(retry_candidates(PipelineStage::Cleaning, &[d1]).is_empty());
    }
}
