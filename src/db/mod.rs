//! Database module for PostgreSQL persistence
//!
//! Postgres is the sole source of truth and the only synchronization point
//! of the pipeline: barrier evaluation relies on row locks and compare-and-
//! swap status updates, and every audit write shares the transaction of the
//! primary write it documents.

pub mod audit;
pub mod claims;
pub mod corpus;
pub mod models;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;

// Environment variable names
const ENV_POSTGRES_HOST: &str = "CLAIMS_POSTGRES_HOST";
const ENV_POSTGRES_PORT: &str = "CLAIMS_POSTGRES_PORT";
const ENV_POSTGRES_USER: &str = "CLAIMS_POSTGRES_USER";
const ENV_POSTGRES_PASSWORD: &str = "CLAIMS_POSTGRES_PASSWORD";
const ENV_POSTGRES_DB: &str = "CLAIMS_POSTGRES_DB";

// Default values
const DEFAULT_POSTGRES_HOST: &str = "127.0.0.1";
const DEFAULT_POSTGRES_PORT: &str = "5432";
const DEFAULT_POSTGRES_USER: &str = "claims";
const DEFAULT_POSTGRES_PASSWORD: &str = "claims";
const DEFAULT_POSTGRES_DB: &str = "claims";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Create a new database connection pool
pub async fn create_pool() -> Result<PgPool, DbError> {
    let host = env::var(ENV_POSTGRES_HOST).unwrap_or_else(|_| DEFAULT_POSTGRES_HOST.to_string());
    let port = env::var(ENV_POSTGRES_PORT).unwrap_or_else(|_| DEFAULT_POSTGRES_PORT.to_string());
    let user = env::var(ENV_POSTGRES_USER).unwrap_or_else(|_| DEFAULT_POSTGRES_USER.to_string());
    let password =
        env::var(ENV_POSTGRES_PASSWORD).unwrap_or_else(|_| DEFAULT_POSTGRES_PASSWORD.to_string());
    let database = env::var(ENV_POSTGRES_DB).unwrap_or_else(|_| DEFAULT_POSTGRES_DB.to_string());

    let database_url = format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, database
    );

    tracing::debug!(host = %host, port = %port, database = %database, "Connecting to PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    tracing::info!(host = %host, port = %port, "PostgreSQL connection established");

    Ok(pool)
}

/// Initialize database schema
pub async fn init_schema(pool: &PgPool) -> Result<(), DbError> {
    // pgvector extension backs the reference corpus similarity search
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS claims (
            id BIGSERIAL PRIMARY KEY,
            country VARCHAR(8) NOT NULL,
            status VARCHAR(32) NOT NULL,
            contract_number TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            analysis_result JSONB,
            analysis_model TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS claim_documents (
            id BIGSERIAL PRIMARY KEY,
            claim_id BIGINT NOT NULL REFERENCES claims(id) ON DELETE CASCADE,
            filename TEXT NOT NULL,
            storage_key TEXT NOT NULL,
            raw_text TEXT,
            cleaned_text TEXT,
            deidentified_text TEXT,
            extraction_reviewed_by TEXT,
            extraction_reviewed_at TIMESTAMPTZ,
            deident_reviewed_by TEXT,
            deident_reviewed_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_reports (
            id BIGSERIAL PRIMARY KEY,
            claim_id BIGINT NOT NULL REFERENCES claims(id) ON DELETE CASCADE,
            storage_key TEXT NOT NULL,
            model_used TEXT NOT NULL,
            prompt_id TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id BIGSERIAL PRIMARY KEY,
            actor TEXT NOT NULL,
            action VARCHAR(64) NOT NULL,
            entity_type VARCHAR(32) NOT NULL,
            entity_id BIGINT NOT NULL,
            changes JSONB,
            timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(&reference_documents_ddl())
        .execute(pool)
        .await?;

    // Create indexes separately
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_claims_status ON claims(status)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_claim_documents_claim_id ON claim_documents(claim_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_audit_log_entity ON audit_log(entity_type, entity_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reference_documents_country ON reference_documents(country)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// The embedding column is sized to the configured embedding model's output;
/// pgvector rejects inserts whose dimension differs from the column's.
fn reference_documents_ddl() -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS reference_documents (
            id BIGSERIAL PRIMARY KEY,
            filename TEXT NOT NULL,
            storage_key TEXT NOT NULL,
            country VARCHAR(8) NOT NULL,
            category TEXT NOT NULL,
            extracted_text TEXT,
            embedding vector({}),
            uploaded_by TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        crate::provider::analysis::EMBEDDING_DIMENSIONS
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::analysis::EMBEDDING_DIMENSIONS;

    #[test]
    fn test_embedding_column_sized_to_model() {
        // text-embedding-3-small emits 1536-dimensional vectors; the column
        // must match or set_extracted writes fail and nothing is searchable.
        assert_eq!(EMBEDDING_DIMENSIONS, 1536);
        assert!(reference_documents_ddl().contains("embedding vector(1536)"));
    }
}
