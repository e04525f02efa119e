//! Reference corpus management: upload, listing, deletion and similarity
//! search over embedded policy documents.

use sqlx::PgPool;
use std::sync::Arc;

use crate::db::corpus::ReferenceDocumentRepository;
use crate::db::models::ListCorpusQuery;
use crate::model::{AuditAction, AuditEntityType, ReferenceDocument, ScoredReference};
use crate::provider::BlobStore;
use crate::service::audit::AuditRecorder;
use crate::service::context::ContextAssembler;
use crate::service::error::PipelineError;
use crate::service::queue::{Job, JobQueue};

pub struct CorpusService {
    pool: PgPool,
    corpus: ReferenceDocumentRepository,
    audit: AuditRecorder,
    queue: JobQueue,
    blob: Arc<dyn BlobStore>,
    context: Arc<ContextAssembler>,
}

impl CorpusService {
    pub fn new(
        pool: PgPool,
        corpus: ReferenceDocumentRepository,
        audit: AuditRecorder,
        queue: JobQueue,
        blob: Arc<dyn BlobStore>,
        context: Arc<ContextAssembler>,
    ) -> Self {
        Self {
            pool,
            corpus,
            audit,
            queue,
            blob,
            context,
        }
    }

    /// Store a reference document and queue extraction plus embedding.
    /// The document becomes searchable only after indexing completes.
    pub async fn upload(
        &self,
        filename: &str,
        country: &str,
        category: &str,
        content: Vec<u8>,
        actor: &str,
    ) -> Result<ReferenceDocument, PipelineError> {
        if country.trim().is_empty() || category.trim().is_empty() {
            return Err(PipelineError::Validation(
                "country and category are required".to_string(),
            ));
        }
        if content.is_empty() {
            return Err(PipelineError::Validation(
                "document content is empty".to_string(),
            ));
        }

        let storage_key = format!("corpus/{}/{}/{}", country, category, filename);
        self.blob.put(&storage_key, &content).await?;

        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        let reference = self
            .corpus
            .insert(&mut tx, filename, &storage_key, country, category, actor)
            .await?;
        let changes = serde_json::json!({
            "filename": filename,
            "country": country,
            "category": category,
        });
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::ReferenceUploaded,
                AuditEntityType::ReferenceDocument,
                reference.id,
                Some(&changes),
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        self.queue.dispatch(Job::EmbedReference {
            reference_id: reference.id,
        });

        tracing::info!(
            reference_id = reference.id,
            country = %country,
            category = %category,
            "Reference document uploaded"
        );

        Ok(reference)
    }

    pub async fn list(
        &self,
        query: ListCorpusQuery,
    ) -> Result<Vec<ReferenceDocument>, PipelineError> {
        Ok(self.corpus.list(query).await?)
    }

    pub async fn delete(&self, reference_id: i64, actor: &str) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;
        let deleted = self.corpus.delete(&mut tx, reference_id).await?;
        if !deleted {
            return Err(PipelineError::NotFound(format!(
                "reference document {}",
                reference_id
            )));
        }
        self.audit
            .record(
                &mut tx,
                actor,
                AuditAction::ReferenceDeleted,
                AuditEntityType::ReferenceDocument,
                reference_id,
                None,
            )
            .await?;
        tx.commit().await.map_err(crate::db::DbError::from)?;

        tracing::info!(reference_id, "Reference document deleted");
        Ok(())
    }

    /// Free-text similarity search against the embedded corpus
    pub async fn search(
        &self,
        query: &str,
        country: &str,
        category: Option<&str>,
    ) -> Result<Vec<ScoredReference>, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::Validation("query is required".to_string()));
        }
        self.context.search(query, country, category).await
    }
}
