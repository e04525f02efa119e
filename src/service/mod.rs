//! Business logic layer

pub mod audit;
pub mod claims;
pub mod cleaner;
pub mod context;
pub mod corpus;
pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod recovery;

pub use audit::AuditRecorder;
pub use claims::{ClaimService, NewClaimDocument};
pub use context::ContextAssembler;
pub use corpus::CorpusService;
pub use error::PipelineError;
pub use orchestrator::Orchestrator;
pub use queue::{Job, JobQueue};
pub use recovery::{RecoveryService, RetryOutcome};
