pub mod analysis;
pub mod audit;
pub mod claim;
pub mod config;
pub mod reference;
pub mod status;

pub use analysis::{ClaimAnalysis, Recommendation};
pub use audit::{text_edit_changes, AuditAction, AuditEntityType, AuditEntry};
pub use claim::{AnalysisReport, Claim, ClaimDocument, PipelineStage};
#[cfg(test)]
pub(crate) use claim::test_document;
pub use config::{Config, PromptTemplate, RetrievalConfig};
pub use reference::{ContextSource, ReferenceDocument, ScoredReference};
pub use status::ClaimStatus;
