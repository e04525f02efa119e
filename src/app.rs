//! Application state and service initialization
//!
//! Centralizes the dependency graph: database, providers, the worker pool
//! and the services injected into Actix handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::db::audit::AuditLogRepository;
use crate::db::claims::ClaimRepository;
use crate::db::corpus::ReferenceDocumentRepository;
use crate::model::Config;
use crate::provider::analysis::OpenAiAnalysisClient;
use crate::provider::deidentify::HttpDeidentifyClient;
use crate::provider::extraction::HttpExtractionClient;
use crate::provider::report::JsonReportRenderer;
use crate::provider::storage::FsBlobStore;
use crate::provider::{
    AnalysisProvider, BlobStore, DeidentificationProvider, ExtractionProvider, ReportRenderer,
};
use crate::service::{
    queue, AuditRecorder, ClaimService, ContextAssembler, CorpusService, Orchestrator,
    RecoveryService,
};

/// Application state containing all services and shared resources
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub claim_service: ClaimService,
    pub corpus_service: CorpusService,
    pub recovery_service: RecoveryService,
    pub audit_recorder: AuditRecorder,
}

impl AppState {
    /// Initialize all services and start the pipeline worker pool
    ///
    /// This performs:
    /// 1. Database connection and schema initialization
    /// 2. Provider client construction (requires OPENAI_API_KEY)
    /// 3. Service dependency graph construction
    /// 4. Worker pool startup
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let db_pool = crate::db::create_pool()
            .await
            .map_err(|e| AppError::DatabaseInit(e.to_string()))?;

        crate::db::init_schema(&db_pool)
            .await
            .map_err(|e| AppError::DatabaseInit(e.to_string()))?;

        let extraction: Arc<dyn ExtractionProvider> = Arc::new(
            HttpExtractionClient::new(config.providers.extraction_url.clone())
                .map_err(|e| AppError::ProviderInit(e.to_string()))?,
        );
        let deidentify: Arc<dyn DeidentificationProvider> = Arc::new(
            HttpDeidentifyClient::new(config.providers.deidentify_url.clone())
                .map_err(|e| AppError::ProviderInit(e.to_string()))?,
        );
        let analysis: Arc<dyn AnalysisProvider> = Arc::new(
            OpenAiAnalysisClient::from_env()
                .map_err(|e| AppError::ProviderInit(e.to_string()))?,
        );
        let blob: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.blob_root.clone()));
        let renderer: Arc<dyn ReportRenderer> = Arc::new(JsonReportRenderer);

        let claims = ClaimRepository::new(db_pool.clone());
        let corpus = ReferenceDocumentRepository::new(db_pool.clone());
        let audit_recorder = AuditRecorder::new(AuditLogRepository::new(db_pool.clone()));

        let context = Arc::new(ContextAssembler::new(
            corpus.clone(),
            Arc::clone(&analysis),
            config.retrieval.clone(),
        ));

        let (job_queue, receiver) = queue::channel();

        let orchestrator = Arc::new(Orchestrator::new(
            db_pool.clone(),
            claims.clone(),
            corpus.clone(),
            audit_recorder.clone(),
            job_queue.clone(),
            Arc::clone(&extraction),
            Arc::clone(&deidentify),
            Arc::clone(&analysis),
            Arc::clone(&blob),
            renderer,
            Arc::clone(&context),
            config.clone(),
        ));

        queue::spawn_workers(config.workers, receiver, orchestrator);

        let claim_service = ClaimService::new(
            db_pool.clone(),
            claims.clone(),
            audit_recorder.clone(),
            job_queue.clone(),
            Arc::clone(&blob),
            config.clone(),
        );

        let corpus_service = CorpusService::new(
            db_pool.clone(),
            corpus,
            audit_recorder.clone(),
            job_queue.clone(),
            blob,
            context,
        );

        let recovery_service = RecoveryService::new(
            db_pool.clone(),
            claims,
            audit_recorder.clone(),
            job_queue,
        );

        Ok(Self {
            db_pool,
            config,
            claim_service,
            corpus_service,
            recovery_service,
            audit_recorder,
        })
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Database initialization failed
    #[error("Database initialization failed: {0}")]
    DatabaseInit(String),

    /// Provider client construction failed
    #[error("Provider initialization failed: {0}")]
    ProviderInit(String),
}
