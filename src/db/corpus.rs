//! Repository for the reference document corpus
//!
//! Embeddings live in a pgvector column; similarity search runs in SQL with
//! `1 - (embedding <=> query)` as cosine similarity. Rows without an
//! embedding are excluded from search by the `embedding IS NOT NULL` filter.

use sqlx::{PgPool, Postgres, Transaction};

use super::models::{ListCorpusQuery, ReferenceDocumentRow, ScoredReferenceRow};
use super::DbError;
use crate::model::{ReferenceDocument, ScoredReference};

const DEFAULT_PAGE_SIZE: u32 = 100;

const REFERENCE_COLUMNS: &str = "id, filename, storage_key, country, category, extracted_text, \
     embedding IS NOT NULL AS has_embedding, uploaded_by, created_at";

/// Render an embedding as a pgvector literal for binding with `::vector`
fn vector_literal(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

#[derive(Clone)]
pub struct ReferenceDocumentRepository {
    pool: PgPool,
}

impl ReferenceDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a reference document without an embedding; it stays invisible
    /// to search until [`set_extracted`](Self::set_extracted) runs.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filename: &str,
        storage_key: &str,
        country: &str,
        category: &str,
        uploaded_by: &str,
    ) -> Result<ReferenceDocument, DbError> {
        let query = format!(
            r#"
            INSERT INTO reference_documents (filename, storage_key, country, category, uploaded_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            REFERENCE_COLUMNS
        );

        let row: ReferenceDocumentRow = sqlx::query_as(&query)
            .bind(filename)
            .bind(storage_key)
            .bind(country)
            .bind(category)
            .bind(uploaded_by)
            .fetch_one(&mut **tx)
            .await?;

        Ok(row.into_domain())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<ReferenceDocument, DbError> {
        let query = format!("SELECT {} FROM reference_documents WHERE id = $1", REFERENCE_COLUMNS);

        let row: ReferenceDocumentRow = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("reference document {}", id)))?;

        Ok(row.into_domain())
    }

    /// Store extracted text and embedding, making the document searchable
    pub async fn set_extracted(
        &self,
        id: i64,
        text: &str,
        embedding: &[f32],
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE reference_documents SET extracted_text = $2, embedding = $3::vector WHERE id = $1",
        )
        .bind(id)
        .bind(text)
        .bind(vector_literal(embedding))
        .execute(&self.pool)
        .await?;

        tracing::debug!(id = %id, "Reference document embedded");
        Ok(())
    }

    /// Delete a reference document by ID
    /// Returns true if the document was deleted, false if it didn't exist
    pub async fn delete(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM reference_documents WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List reference documents with pagination and filters
    pub async fn list(&self, query: ListCorpusQuery) -> Result<Vec<ReferenceDocument>, DbError> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(500);
        let offset = query.offset.unwrap_or(0);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref country) = query.country {
            params.push(country.clone());
            conditions.push(format!("country = ${}", params.len()));
        }

        if let Some(ref category) = query.category {
            params.push(category.clone());
            conditions.push(format!("category = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_query = format!(
            r#"
            SELECT {} FROM reference_documents
            {}
            ORDER BY created_at DESC
            LIMIT {} OFFSET {}
            "#,
            REFERENCE_COLUMNS, where_clause, limit, offset
        );

        let rows: Vec<ReferenceDocumentRow> = {
            let mut q = sqlx::query_as(&select_query);
            for param in &params {
                q = q.bind(param);
            }
            q.fetch_all(&self.pool).await?
        };

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    /// Nearest-neighbor search over embedded documents of one country.
    ///
    /// Results below `similarity_threshold` are filtered out in SQL and the
    /// remainder is returned ordered by similarity descending, capped at
    /// `top_k`.
    pub async fn search(
        &self,
        embedding: &[f32],
        country: &str,
        category: Option<&str>,
        similarity_threshold: f64,
        top_k: u32,
    ) -> Result<Vec<ScoredReference>, DbError> {
        let literal = vector_literal(embedding);

        let mut query_parts = vec![
            "SELECT id, filename, country, category, extracted_text,".to_string(),
            "1 - (embedding <=> $1::vector) AS similarity".to_string(),
            "FROM reference_documents".to_string(),
            "WHERE country = $2".to_string(),
            "AND embedding IS NOT NULL".to_string(),
            "AND (1 - (embedding <=> $1::vector)) >= $3".to_string(),
        ];

        if category.is_some() {
            query_parts.push("AND category = $5".to_string());
        }

        query_parts.push("ORDER BY embedding <=> $1::vector".to_string());
        query_parts.push("LIMIT $4".to_string());

        let query_str = query_parts.join(" ");

        let rows: Vec<ScoredReferenceRow> = {
            let mut q = sqlx::query_as(&query_str)
                .bind(&literal)
                .bind(country)
                .bind(similarity_threshold)
                .bind(top_k as i64);
            if let Some(cat) = category {
                q = q.bind(cat);
            }
            q.fetch_all(&self.pool).await?
        };

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_literal_format() {
        assert_eq!(vector_literal(&[1.0, -0.5, 0.25]), "[1,-0.5,0.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }
}
