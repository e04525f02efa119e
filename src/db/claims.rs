//! Repository for claim and claim-document database operations
//!
//! Mutating methods take an open transaction so callers can commit the
//! primary write and its audit entry atomically. Status changes go through
//! [`ClaimRepository::transition`], a compare-and-swap on the current status:
//! two workers observing the same satisfied barrier can both attempt the
//! move, but only one UPDATE matches and the other becomes a no-op.

use sqlx::{PgPool, Postgres, Transaction};

use super::models::{
    AnalysisReportRow, ClaimDocumentRow, ClaimRow, ListClaimsQuery,
};
use super::DbError;
use crate::model::{AnalysisReport, Claim, ClaimDocument, ClaimStatus, PipelineStage};

const DEFAULT_PAGE_SIZE: u32 = 100;

/// Paginated claim listing with per-claim document counts
#[derive(Debug, Clone)]
pub struct PaginatedClaims {
    pub claims: Vec<(Claim, i64)>,
    pub total_count: i64,
}

/// Repository for claim aggregate operations
#[derive(Clone)]
pub struct ClaimRepository {
    pool: PgPool,
}

impl ClaimRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new claim in the initial processing state
    pub async fn insert_claim(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        country: &str,
        contract_number: Option<&str>,
    ) -> Result<Claim, DbError> {
        let row: ClaimRow = sqlx::query_as(
            r#"
            INSERT INTO claims (country, status, contract_number)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(country)
        .bind(ClaimStatus::Processing.as_str())
        .bind(contract_number)
        .fetch_one(&mut **tx)
        .await?;

        row.into_domain().map_err(DbError::Serialization)
    }

    pub async fn insert_document(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim_id: i64,
        filename: &str,
        storage_key: &str,
    ) -> Result<ClaimDocument, DbError> {
        let row: ClaimDocumentRow = sqlx::query_as(
            r#"
            INSERT INTO claim_documents (claim_id, filename, storage_key)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(claim_id)
        .bind(filename)
        .bind(storage_key)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.into_domain())
    }

    /// Get a claim by ID
    pub async fn get_claim(&self, id: i64) -> Result<Claim, DbError> {
        let row: ClaimRow = sqlx::query_as("SELECT * FROM claims WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("claim {}", id)))?;

        row.into_domain().map_err(DbError::Serialization)
    }

    /// Get a claim by ID inside a transaction, locking its row.
    ///
    /// The row lock serializes concurrent barrier evaluations for the same
    /// claim; sibling documents finishing together queue up here.
    pub async fn get_claim_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<Claim, DbError> {
        let row: ClaimRow = sqlx::query_as("SELECT * FROM claims WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("claim {}", id)))?;

        row.into_domain().map_err(DbError::Serialization)
    }

    /// All documents of a claim, in upload order
    pub async fn documents(&self, claim_id: i64) -> Result<Vec<ClaimDocument>, DbError> {
        let rows: Vec<ClaimDocumentRow> =
            sqlx::query_as("SELECT * FROM claim_documents WHERE claim_id = $1 ORDER BY id")
                .bind(claim_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    /// Transactional read of a claim's documents for barrier evaluation
    pub async fn documents_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim_id: i64,
    ) -> Result<Vec<ClaimDocument>, DbError> {
        let rows: Vec<ClaimDocumentRow> =
            sqlx::query_as("SELECT * FROM claim_documents WHERE claim_id = $1 ORDER BY id")
                .bind(claim_id)
                .fetch_all(&mut **tx)
                .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    pub async fn get_document(&self, id: i64) -> Result<ClaimDocument, DbError> {
        let row: ClaimDocumentRow = sqlx::query_as("SELECT * FROM claim_documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("claim document {}", id)))?;

        Ok(row.into_domain())
    }

    /// List claims with pagination and filters
    pub async fn list(&self, query: ListClaimsQuery) -> Result<PaginatedClaims, DbError> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(500);
        let offset = query.offset.unwrap_or(0);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(status) = query.status {
            params.push(status.as_str().to_string());
            conditions.push(format!("status = ${}", params.len()));
        }

        if let Some(ref country) = query.country {
            params.push(country.clone());
            conditions.push(format!("country = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM claims {}", where_clause);

        let total_count: i64 = {
            let mut q = sqlx::query_scalar(&count_query);
            for param in &params {
                q = q.bind(param);
            }
            q.fetch_one(&self.pool).await?
        };

        let select_query = format!(
            r#"
            SELECT * FROM claims
            {}
            ORDER BY created_at DESC
            LIMIT {} OFFSET {}
            "#,
            where_clause, limit, offset
        );

        let rows: Vec<ClaimRow> = {
            let mut q = sqlx::query_as(&select_query);
            for param in &params {
                q = q.bind(param);
            }
            q.fetch_all(&self.pool).await?
        };

        let claims: Vec<Claim> = rows
            .into_iter()
            .map(|row| row.into_domain().map_err(DbError::Serialization))
            .collect::<Result<_, _>>()?;

        let ids: Vec<i64> = claims.iter().map(|c| c.id).collect();
        let counts: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT claim_id, COUNT(*) FROM claim_documents WHERE claim_id = ANY($1) GROUP BY claim_id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let claims = claims
            .into_iter()
            .map(|c| {
                let count = counts
                    .iter()
                    .find(|(id, _)| *id == c.id)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                (c, count)
            })
            .collect();

        Ok(PaginatedClaims {
            claims,
            total_count,
        })
    }

    /// Persist one stage's output text for a document. The write is guarded
    /// on the stage's input column still being populated; an operator
    /// re-clean that nulled the input between job start and commit makes
    /// this a no-op. Returns whether the row was written.
    pub async fn set_stage_text(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        document_id: i64,
        stage: PipelineStage,
        text: &str,
    ) -> Result<bool, DbError> {
        let mut sql = format!(
            "UPDATE claim_documents SET {} = $2 WHERE id = $1",
            stage.output_column()
        );
        if let Some(input) = stage.input_column() {
            sql.push_str(&format!(" AND {} IS NOT NULL", input));
        }

        let result = sqlx::query(&sql)
            .bind(document_id)
            .bind(text)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Compare-and-swap status transition. Returns false when the claim was
    /// no longer in `from`, meaning another worker already moved it.
    pub async fn transition(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim_id: i64,
        from: ClaimStatus,
        to: ClaimStatus,
    ) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE claims SET status = $3 WHERE id = $1 AND status = $2")
            .bind(claim_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Unconditional status write, used only by the administrative
    /// operations and the broadcast failure path.
    pub async fn force_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim_id: i64,
        to: ClaimStatus,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE claims SET status = $2 WHERE id = $1")
            .bind(claim_id)
            .bind(to.as_str())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub async fn set_analysis_result(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim_id: i64,
        result: &serde_json::Value,
        model: &str,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE claims SET analysis_result = $2, analysis_model = $3 WHERE id = $1")
            .bind(claim_id)
            .bind(result)
            .bind(model)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Overwrite reviewed raw text and stamp the extraction reviewer
    pub async fn update_raw_text_reviewed(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        document_id: i64,
        text: &str,
        reviewer: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE claim_documents
            SET raw_text = $2, extraction_reviewed_by = $3, extraction_reviewed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(document_id)
        .bind(text)
        .bind(reviewer)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Overwrite reviewed de-identified text and stamp the reviewer
    pub async fn update_deidentified_text_reviewed(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        document_id: i64,
        text: &str,
        reviewer: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE claim_documents
            SET deidentified_text = $2, deident_reviewed_by = $3, deident_reviewed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(document_id)
        .bind(text)
        .bind(reviewer)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Stamp reviewer on all documents of a claim that were not individually
    /// edited before the gate approval
    pub async fn stamp_extraction_review(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim_id: i64,
        reviewer: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE claim_documents
            SET extraction_reviewed_by = $2, extraction_reviewed_at = NOW()
            WHERE claim_id = $1 AND extraction_reviewed_by IS NULL
            "#,
        )
        .bind(claim_id)
        .bind(reviewer)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn stamp_deident_review(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim_id: i64,
        reviewer: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE claim_documents
            SET deident_reviewed_by = $2, deident_reviewed_at = NOW()
            WHERE claim_id = $1 AND deident_reviewed_by IS NULL
            "#,
        )
        .bind(claim_id)
        .bind(reviewer)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Null cleaned and de-identified text on every document of the claim.
    /// Used by the administrative re-clean, which restarts from cleaning.
    pub async fn clear_derived_texts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim_id: i64,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE claim_documents SET cleaned_text = NULL, deidentified_text = NULL WHERE claim_id = $1",
        )
        .bind(claim_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Delete a claim; documents and reports cascade.
    /// Returns true if the claim existed.
    pub async fn delete_claim(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim_id: i64,
    ) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM claims WHERE id = $1")
            .bind(claim_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_report(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim_id: i64,
        storage_key: &str,
        model_used: &str,
        prompt_id: &str,
    ) -> Result<AnalysisReport, DbError> {
        let row: AnalysisReportRow = sqlx::query_as(
            r#"
            INSERT INTO analysis_reports (claim_id, storage_key, model_used, prompt_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(claim_id)
        .bind(storage_key)
        .bind(model_used)
        .bind(prompt_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.into_domain())
    }

    pub async fn list_reports(&self, claim_id: i64) -> Result<Vec<AnalysisReport>, DbError> {
        let rows: Vec<AnalysisReportRow> = sqlx::query_as(
            "SELECT * FROM analysis_reports WHERE claim_id = $1 ORDER BY created_at DESC",
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
