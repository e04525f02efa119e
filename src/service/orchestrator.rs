//! Pipeline orchestration: stage handlers, the completion barrier and the
//! failure broadcast.
//!
//! Every handler is idempotent. Stage output that already exists makes the
//! handler a no-op, and claim-level transitions go through a compare-and-
//! swap, so duplicate jobs and racing workers resolve to a single winner.
//! Any provider failure inside a stage marks the whole claim FAILED; there
//! is no per-document partial failure state.

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;

use crate::db::claims::ClaimRepository;
use crate::db::corpus::ReferenceDocumentRepository;
use crate::model::{
    AuditAction, AuditEntityType, Claim, ClaimAnalysis, ClaimDocument, ClaimStatus, Config,
    PipelineStage,
};
use crate::provider::{
    AnalysisProvider, BlobStore, DeidentificationProvider, ExtractionProvider, ReportRenderer,
};
use crate::service::audit::AuditRecorder;
use crate::service::cleaner::TextCleaner;
use crate::service::context::ContextAssembler;
use crate::service::error::PipelineError;
use crate::service::queue::{Job, JobQueue};

const SYSTEM_ACTOR: &str = "system";

pub struct Orchestrator {
    pool: PgPool,
    claims: ClaimRepository,
    corpus: ReferenceDocumentRepository,
    audit: AuditRecorder,
    queue: JobQueue,
    extraction: Arc<dyn ExtractionProvider>,
    deidentify: Arc<dyn DeidentificationProvider>,
    analysis: Arc<dyn AnalysisProvider>,
    blob: Arc<dyn BlobStore>,
    renderer: Arc<dyn ReportRenderer>,
    context: Arc<ContextAssembler>,
    cleaner: TextCleaner,
    config: Config,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        claims: ClaimRepository,
        corpus: ReferenceDocumentRepository,
        audit: AuditRecorder,
        queue: JobQueue,
        extraction: Arc<dyn ExtractionProvider>,
        deidentify: Arc<dyn DeidentificationProvider>,
        analysis: Arc<dyn AnalysisProvider>,
        blob: Arc<dyn BlobStore>,
        renderer: Arc<dyn ReportRenderer>,
        context: Arc<ContextAssembler>,
        config: Config,
    ) -> Self {
        Self {
            pool,
            claims,
            corpus,
            audit,
            queue,
            extraction,
            deidentify,
            analysis,
            blob,
            renderer,
            context,
            cleaner: TextCleaner::new(),
            config,
        }
    }

    /// Entry point for the worker pool. Never returns an error; failures are
    /// recorded on the claim and logged.
    pub async fn run(&self, job: Job) {
        match job {
            Job::ExtractDocument { document_id } => {
                self.run_stage(document_id, PipelineStage::Extraction).await;
            }
            Job::CleanDocument { document_id } => {
                self.run_stage(document_id, PipelineStage::Cleaning).await;
            }
            Job::DeidentifyDocument { document_id, .. } => {
                self.run_stage(document_id, PipelineStage::Deidentification)
                    .await;
            }
            Job::AnalyzeClaim {
                claim_id,
                prompt_id,
                actor,
            } => {
                if let Err(e) = self.analyze_claim(claim_id, &prompt_id, &actor).await {
                    tracing::error!(claim_id, error = %e, "Analysis failed");
                    self.fail_claim(claim_id, "analysis", &e).await;
                }
            }
            Job::GenerateReport {
                claim_id,
                prompt_id,
                model_used,
                sources,
                actor,
            } => {
                if let Err(e) = self
                    .generate_report(claim_id, &prompt_id, &model_used, sources, &actor)
                    .await
                {
                    tracing::error!(claim_id, error = %e, "Report generation failed");
                    self.fail_claim(claim_id, "report", &e).await;
                }
            }
            Job::EmbedReference { reference_id } => {
                // Corpus ingestion has no claim to fail; an error just leaves
                // the document unsearchable until re-uploaded.
                if let Err(e) = self.embed_reference(reference_id).await {
                    tracing::warn!(reference_id, error = %e, "Reference embedding failed");
                }
            }
        }
    }

    async fn run_stage(&self, document_id: i64, stage: PipelineStage) {
        let doc = match self.claims.get_document(document_id).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(document_id, stage = stage.name(), error = %e, "Stage skipped, document unavailable");
                return;
            }
        };

        if let Err(e) = self.process_document(&doc, stage).await {
            tracing::error!(
                document_id,
                claim_id = doc.claim_id,
                stage = stage.name(),
                error = %e,
                "Stage failed"
            );
            self.fail_claim(doc.claim_id, stage.name(), &e).await;
        }
    }

    /// Run one stage over one document, then evaluate the claim barrier.
    async fn process_document(
        &self,
        doc: &ClaimDocument,
        stage: PipelineStage,
    ) -> Result<(), PipelineError> {
        if stage.is_complete(doc) {
            tracing::debug!(
                document_id = doc.id,
                stage = stage.name(),
                "Stage output already present, skipping"
            );
        } else {
            let output = self.produce_output(doc, stage).await?;

            let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
            let written = self
                .claims
                .set_stage_text(&mut tx, doc.id, stage, &output)
                .await?;
            if !written {
                // Input was nulled mid-flight (operator re-clean); dropping
                // the transaction discards the output and the claim restarts
                // from CLEANING with this document's derived texts empty.
                tracing::warn!(
                    document_id = doc.id,
                    claim_id = doc.claim_id,
                    stage = stage.name(),
                    "Stage input changed mid-flight, output discarded"
                );
                return Ok(());
            }
            if stage == PipelineStage::Cleaning {
                let changes = serde_json::json!({
                    "chars_in": doc.raw_text.as_deref().map(str::len),
                    "chars_out": output.len(),
                });
                self.audit
                    .record(
                        &mut tx,
                        SYSTEM_ACTOR,
                        AuditAction::CleaningCompleted,
                        AuditEntityType::ClaimDocument,
                        doc.id,
                        Some(&changes),
                    )
                    .await?;
            }
            tx.commit().await.map_err(crate::db::DbError::from)?;

            tracing::info!(
                document_id = doc.id,
                claim_id = doc.claim_id,
                stage = stage.name(),
                "Stage completed"
            );
        }

        if self.evaluate_barrier(doc.claim_id, stage).await? {
            self.fan_out_after_barrier(doc.claim_id, stage).await?;
        }

        Ok(())
    }

    async fn produce_output(
        &self,
        doc: &ClaimDocument,
        stage: PipelineStage,
    ) -> Result<String, PipelineError> {
        match stage {
            PipelineStage::Extraction => {
                let content = self.blob.get(&doc.storage_key).await?;
                Ok(self.extraction.extract(&content, &doc.filename).await?)
            }
            PipelineStage::Cleaning => {
                let raw = stage.input_text(doc).ok_or_else(|| {
                    PipelineError::Consistency(format!(
                        "document {} has no raw text to clean",
                        doc.id
                    ))
                })?;
                Ok(self.cleaner.clean(raw))
            }
            PipelineStage::Deidentification => {
                let cleaned = stage.input_text(doc).ok_or_else(|| {
                    PipelineError::Consistency(format!(
                        "document {} has no cleaned text to de-identify",
                        doc.id
                    ))
                })?;
                let claim = self.claims.get_claim(doc.claim_id).await?;
                let result = self
                    .deidentify
                    .deidentify(cleaned, &claim.country, &self.config.providers.language)
                    .await?;
                if !result.entities_found.is_empty() {
                    tracing::debug!(
                        document_id = doc.id,
                        entities = result.entities_found.len(),
                        "Personal data entities removed"
                    );
                }
                Ok(result.text)
            }
        }
    }

    /// Evaluate the stage completion barrier for a claim.
    ///
    /// The claim row is locked for the duration so concurrent evaluations
    /// for sibling documents serialize; the status move itself is still a
    /// compare-and-swap and exactly one caller wins. Returns whether this
    /// call performed the transition.
    async fn evaluate_barrier(
        &self,
        claim_id: i64,
        stage: PipelineStage,
    ) -> Result<bool, PipelineError> {
        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;

        let claim = self.claims.get_claim_for_update(&mut tx, claim_id).await?;
        if claim.status != stage.active_status() {
            // Already moved on, or an operator intervened
            return Ok(false);
        }

        let docs = self.claims.documents_tx(&mut tx, claim_id).await?;
        if !stage.barrier_satisfied(&docs) {
            return Ok(false);
        }

        let won = self
            .claims
            .transition(&mut tx, claim_id, stage.active_status(), stage.barrier_target())
            .await?;
        if won {
            self.audit
                .record_status_change(
                    &mut tx,
                    SYSTEM_ACTOR,
                    claim_id,
                    stage.active_status(),
                    stage.barrier_target(),
                )
                .await?;
            tx.commit().await.map_err(crate::db::DbError::from)?;

            tracing::info!(
                claim_id,
                from = stage.active_status().as_str(),
                to = stage.barrier_target().as_str(),
                "Barrier satisfied, claim advanced"
            );
        }

        Ok(won)
    }

    /// Enqueue the follow-up work for a barrier transition. Review gates
    /// wait for a human; only cleaning flows straight into the next stage.
    async fn fan_out_after_barrier(
        &self,
        claim_id: i64,
        stage: PipelineStage,
    ) -> Result<(), PipelineError> {
        if stage != PipelineStage::Cleaning {
            return Ok(());
        }

        let claim = self.claims.get_claim(claim_id).await?;
        let docs = self.claims.documents(claim_id).await?;
        for doc in docs {
            self.queue.dispatch(Job::DeidentifyDocument {
                document_id: doc.id,
                country: claim.country.clone(),
            });
        }
        Ok(())
    }

    async fn analyze_claim(
        &self,
        claim_id: i64,
        prompt_id: &str,
        actor: &str,
    ) -> Result<(), PipelineError> {
        let template = self.config.prompt_template(prompt_id).ok_or_else(|| {
            PipelineError::Validation(format!("unknown prompt template: {}", prompt_id))
        })?;

        // Claim the work. Losing the swap means another worker already has it.
        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        let won = self
            .claims
            .transition(
                &mut tx,
                claim_id,
                ClaimStatus::ReadyForAnalysis,
                ClaimStatus::Analyzing,
            )
            .await?;
        if !won {
            tracing::warn!(claim_id, "Claim not ready for analysis, job skipped");
            return Ok(());
        }
        let changes = serde_json::json!({
            "prompt_id": prompt_id,
            "model": self.analysis.model_id(),
        });
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::AnalysisStarted,
                AuditEntityType::Claim,
                claim_id,
                Some(&changes),
            )
            .await?;
        self.audit
            .record_status_change(
                &mut tx,
                actor,
                claim_id,
                ClaimStatus::ReadyForAnalysis,
                ClaimStatus::Analyzing,
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        let claim = self.claims.get_claim(claim_id).await?;
        let docs = self.claims.documents(claim_id).await?;
        let claim_text = combined_claim_text(&docs)?;

        let context = self.context.assemble(&claim_text, &claim.country).await?;

        tracing::info!(
            claim_id,
            context_sources = context.sources.len(),
            prompt_id,
            "Running claim analysis"
        );

        let analysis = self
            .analysis
            .analyze(&claim_text, &context.text, &template.template)
            .await?;

        let result_json = serde_json::to_value(&analysis)
            .map_err(|e| PipelineError::Consistency(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        self.claims
            .set_analysis_result(&mut tx, claim_id, &result_json, self.analysis.model_id())
            .await?;
        let changes = serde_json::json!({
            "recommendation": analysis.recommendation,
            "confidence": analysis.confidence,
        });
        self.audit
            .record(
                &mut tx,
                SYSTEM_ACTOR,
                AuditAction::AnalysisCompleted,
                AuditEntityType::Claim,
                claim_id,
                Some(&changes),
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        self.queue.dispatch(Job::GenerateReport {
            claim_id,
            prompt_id: prompt_id.to_string(),
            model_used: self.analysis.model_id().to_string(),
            sources: context.sources,
            actor: actor.to_string(),
        });

        Ok(())
    }

    async fn generate_report(
        &self,
        claim_id: i64,
        prompt_id: &str,
        model_used: &str,
        sources: Vec<crate::model::ContextSource>,
        actor: &str,
    ) -> Result<(), PipelineError> {
        let claim = self.claims.get_claim(claim_id).await?;
        let analysis = parse_analysis(&claim)?;

        let bytes = self
            .renderer
            .render(&claim, &analysis, &sources, model_used, prompt_id)?;

        let storage_key = format!(
            "claims/{}/reports/analysis_{}.{}",
            claim_id,
            Utc::now().format("%Y%m%d%H%M%S"),
            self.renderer.file_extension()
        );
        self.blob.put(&storage_key, &bytes).await?;

        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        let report = self
            .claims
            .insert_report(&mut tx, claim_id, &storage_key, model_used, prompt_id)
            .await?;
        let changes = serde_json::json!({ "storage_key": storage_key });
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::ReportGenerated,
                AuditEntityType::Claim,
                claim_id,
                Some(&changes),
            )
            .await?;
        let won = self
            .claims
            .transition(&mut tx, claim_id, ClaimStatus::Analyzing, ClaimStatus::Analyzed)
            .await?;
        if won {
            self.audit
                .record_status_change(
                    &mut tx,
                    SYSTEM_ACTOR,
                    claim_id,
                    ClaimStatus::Analyzing,
                    ClaimStatus::Analyzed,
                )
                .await?;
        }
        tx.commit().await.map_err(crate::db::DbError::from)?;

        tracing::info!(claim_id, report_id = report.id, "Report generated");
        Ok(())
    }

    /// Extract, embed and index one reference corpus document
    async fn embed_reference(&self, reference_id: i64) -> Result<(), PipelineError> {
        let reference = self.corpus.get_by_id(reference_id).await?;
        if reference.has_embedding {
            tracing::debug!(reference_id, "Reference already embedded, skipping");
            return Ok(());
        }

        let content = self.blob.get(&reference.storage_key).await?;
        let text = self.extraction.extract(&content, &reference.filename).await?;
        let embedding = self.analysis.embed(&text).await?;
        self.corpus.set_extracted(reference_id, &text, &embedding).await?;

        tracing::info!(reference_id, filename = %reference.filename, "Reference document indexed");
        Ok(())
    }

    /// Broadcast failure: one failed document fails the whole claim.
    /// Never propagates its own errors, the original failure matters more.
    async fn fail_claim(&self, claim_id: i64, stage: &str, error: &PipelineError) {
        let result: Result<(), PipelineError> = async {
            let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
            let claim = self.claims.get_claim_for_update(&mut tx, claim_id).await?;
            if claim.status == ClaimStatus::Failed {
                return Ok(());
            }
            self.claims
                .force_status(&mut tx, claim_id, ClaimStatus::Failed)
                .await?;
            let changes = serde_json::json!({
                "old_value": claim.status.as_str(),
                "new_value": ClaimStatus::Failed.as_str(),
                "stage": stage,
                "error": error.to_string(),
            });
            self.audit
                .record(
                    &mut tx,
                    SYSTEM_ACTOR,
                    AuditAction::ClaimStatusChanged,
                    AuditEntityType::Claim,
                    claim_id,
                    Some(&changes),
                )
                .await?;
            tx.commit().await.map_err(crate::db::DbError::from)?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::error!(claim_id, error = %e, "Could not record claim failure");
        }
    }
}

/// Concatenate the de-identified texts of a claim's documents in upload
/// order. Missing text at this point is a consistency defect; analysis only
/// runs past the de-identification review gate.
pub fn combined_claim_text(docs: &[ClaimDocument]) -> Result<String, PipelineError> {
    let mut parts = Vec::with_capacity(docs.len());
    for doc in docs {
        let text = doc.deidentified_text.as_deref().ok_or_else(|| {
            PipelineError::Consistency(format!(
                "document {} has no de-identified text",
                doc.id
            ))
        })?;
        parts.push(format!("Document: {}\n{}", doc.filename, text));
    }
    Ok(parts.join("\n\n"))
}

fn parse_analysis(claim: &Claim) -> Result<ClaimAnalysis, PipelineError> {
    let value = claim.analysis_result.clone().ok_or_else(|| {
        PipelineError::Consistency(format!("claim {} has no analysis result", claim.id))
    })?;
    serde_json::from_value(value).map_err(|e| {
        PipelineError::Consistency(format!("claim {} analysis result malformed: {}", claim.id, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_document;

    #[test]
    fn test_combined_claim_text_format() {
        let mut d1 = test_document(1, 5);
        let mut d2 = test_document(2, 5);
        d1.deidentified_text = Some("First body".into());
        d2.deidentified_text = Some("Second body".into());

        let text = combined_claim_text(&[d1, d2]).unwrap();
        assert_eq!(
            text,
            "Document: doc-1.pdf\nFirst body\n\nDocument: doc-2.pdf\nSecond body"
        );
    }

    #[test]
    fn test_combined_claim_text_rejects_missing_text() {
        let d1 = test_document(1, 5);
        assert!(matches!(
            combined_claim_text(&[d1]),
            Err(PipelineError::Consistency(_))
        ));
    }
}
