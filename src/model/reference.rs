//! Reference corpus domain models used by the context assembler.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// A corpus entry with an independent lifecycle from claims.
///
/// A document is eligible for similarity search only once its embedding has
/// been computed; until then it exists but is never retrieved.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReferenceDocument {
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

/// A reference document scored against a query embedding.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoredReference {
    pub id: i64,
    pub filename: String,
    pub country: String,
    pub category: String,
    pub text: String,
    /// Cosine similarity in `[0, 1]`, already filtered by the configured
    /// threshold.
    pub similarity: f64,
}

/// Citation record for one excerpt included in assembled context.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize, ToSchema)]
pub struct ContextSource {
    pub filename: String,
    pub category: String,
    pub similarity: f64,
}
