//! Service-level error taxonomy

use crate::db::DbError;
use crate::provider::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The request conflicts with the claim's current state or is malformed
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Stored data violates an invariant the pipeline relies on
    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for PipelineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => PipelineError::NotFound(what),
            other => PipelineError::Database(other),
        }
    }
}
