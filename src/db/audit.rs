//! Repository for the append-only audit log
//!
//! Entries are only ever inserted. There is deliberately no update or delete
//! method on this type, and inserts go through the caller's transaction so
//! an entry commits exactly when the write it documents commits.

use sqlx::{PgPool, Postgres, Transaction};

use super::models::{AuditLogRow, ListAuditQuery};
use super::DbError;
use crate::model::{AuditAction, AuditEntityType, AuditEntry};

const DEFAULT_PAGE_SIZE: u32 = 100;
const TRAIL_LIMIT: i64 = 1000;

#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry within the caller's transaction
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        actor: &str,
        action: AuditAction,
        entity_type: AuditEntityType,
        entity_id: i64,
        changes: Option<&serde_json::Value>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (actor, action, entity_type, entity_id, changes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(actor)
        .bind(action.as_str())
        .bind(entity_type.as_str())
        .bind(entity_id)
        .bind(changes)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// List audit entries with filters, newest first
    pub async fn list(&self, query: ListAuditQuery) -> Result<Vec<AuditEntry>, DbError> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(1000);
        let offset = query.offset.unwrap_or(0);

        let mut conditions = Vec::new();
        let mut text_params: Vec<String> = Vec::new();
        let mut id_param: Option<i64> = None;

        if let Some(ref entity_type) = query.entity_type {
            text_params.push(entity_type.clone());
            conditions.push(format!("entity_type = ${}", text_params.len()));
        }

        if let Some(ref actor) = query.actor {
            text_params.push(actor.clone());
            conditions.push(format!("actor = ${}", text_params.len()));
        }

        if let Some(ref action) = query.action {
            text_params.push(action.clone());
            conditions.push(format!("action = ${}", text_params.len()));
        }

        if let Some(entity_id) = query.entity_id {
            id_param = Some(entity_id);
            conditions.push(format!("entity_id = ${}", text_params.len() + 1));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_query = format!(
            r#"
            SELECT * FROM audit_log
            {}
            ORDER BY timestamp DESC
            LIMIT {} OFFSET {}
            "#,
            where_clause, limit, offset
        );

        let rows: Vec<AuditLogRow> = {
            let mut q = sqlx::query_as(&select_query);
            for param in &text_params {
                q = q.bind(param);
            }
            if let Some(id) = id_param {
                q = q.bind(id);
            }
            q.fetch_all(&self.pool).await?
        };

        rows.into_iter()
            .map(|row| row.into_domain().map_err(DbError::Serialization))
            .collect()
    }

    /// Full trail for a claim: the claim's own entries unioned with every
    /// owned document's entries, merge-sorted by timestamp descending.
    pub async fn claim_trail(&self, claim_id: i64) -> Result<Vec<AuditEntry>, DbError> {
        let rows: Vec<AuditLogRow> = sqlx::query_as(
            r#"
            SELECT * FROM audit_log
            WHERE (entity_type = $1 AND entity_id = $2)
               OR (entity_type = $3 AND entity_id IN (
                    SELECT id FROM claim_documents WHERE claim_id = $2
                  ))
            ORDER BY timestamp DESC
            LIMIT $4
            "#,
        )
        .bind(AuditEntityType::Claim.as_str())
        .bind(claim_id)
        .bind(AuditEntityType::ClaimDocument.as_str())
        .bind(TRAIL_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.into_domain().map_err(DbError::Serialization))
            .collect()
    }
}
