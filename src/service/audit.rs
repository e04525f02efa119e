//! Audit trail recording and queries

use serde_json::json;
use sqlx::{Postgres, Transaction};

use crate::db::audit::AuditLogRepository;
use crate::db::models::ListAuditQuery;
use crate::model::{AuditAction, AuditEntityType, AuditEntry, ClaimStatus};
use crate::service::error::PipelineError;

/// Service wrapper over the audit log. Writes ride the caller's transaction
/// so an audit entry can never exist for a change that rolled back.
#[derive(Clone)]
pub struct AuditRecorder {
    repository: AuditLogRepository,
}

impl AuditRecorder {
    pub fn new(repository: AuditLogRepository) -> Self {
        Self { repository }
    }

    pub async fn record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        actor: &str,
        action: AuditAction,
        entity_type: AuditEntityType,
        entity_id: i64,
        changes: Option<&serde_json::Value>,
    ) -> Result<(), PipelineError> {
        self.repository
            .insert(tx, actor, action, entity_type, entity_id, changes)
            .await?;

        tracing::debug!(
            actor = %actor,
            action = %action,
            entity_type = %entity_type,
            entity_id = %entity_id,
            "Audit entry recorded"
        );
        Ok(())
    }

    /// Record a claim status change with the standard old/new payload
    pub async fn record_status_change(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        actor: &str,
        claim_id: i64,
        from: ClaimStatus,
        to: ClaimStatus,
    ) -> Result<(), PipelineError> {
        let changes = json!({
            "old_value": from.as_str(),
            "new_value": to.as_str(),
        });
        self.record(
            tx,
            actor,
            AuditAction::ClaimStatusChanged,
            AuditEntityType::Claim,
            claim_id,
            Some(&changes),
        )
        .await
    }

    pub async fn list(&self, query: ListAuditQuery) -> Result<Vec<AuditEntry>, PipelineError> {
        Ok(self.repository.list(query).await?)
    }

    /// Complete trail for a claim, including its documents' entries
    pub async fn claim_trail(&self, claim_id: i64) -> Result<Vec<AuditEntry>, PipelineError> {
        Ok(self.repository.claim_trail(claim_id).await?)
    }
}
