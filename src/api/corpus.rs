//! REST API endpoints for the reference corpus

use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::actor_from;
use crate::api::error::ApiError;
use crate::db::models::ListCorpusQuery;
use crate::service::CorpusService;

/// Reference document upload request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadReferenceRequest {
    pub filename: String,
    /// ISO country code the document applies to
    pub country: String,
    /// Document category (policy, exclusions, guidelines, ...)
    pub category: String,
    /// Base64-encoded file content
    pub content_base64: String,
}

/// Query parameters for listing reference documents
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCorpusParams {
    pub country: Option<String>,
    pub category: Option<String>,
    /// Maximum results (default: 100, max: 500)
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Corpus similarity search request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchCorpusRequest {
    pub query: String,
    pub country: String,
    pub category: Option<String>,
}

/// One similarity search hit
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchHit {
    pub id: i64,
    pub filename: String,
    pub category: String,
    pub similarity: f64,
    pub excerpt: String,
}

const EXCERPT_CHARS: usize = 500;

/// Upload a reference document; it becomes searchable once indexed
#[utoipa::path(
    post,
    path = "/v1/corpus",
    request_body = UploadReferenceRequest,
    responses(
        (status = 201, description = "Reference document stored", body = crate::model::ReferenceDocument),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    ),
    tag = "corpus"
)]
#[post("/v1/corpus")]
pub async fn upload_reference(
    service: web::Data<CorpusService>,
    body: web::Json<UploadReferenceRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let actor = actor_from(&req);
    let body = body.into_inner();

    let content = BASE64
        .decode(&body.content_base64)
        .map_err(|_| ApiError::Validation("content is not valid base64".to_string()))?;

    let reference = service
        .upload(&body.filename, &body.country, &body.category, content, &actor)
        .await?;

    Ok(HttpResponse::Created().json(reference))
}

/// List reference documents
#[utoipa::path(
    get,
    path = "/v1/corpus",
    params(ListCorpusParams),
    responses(
        (status = 200, description = "Reference documents", body = [crate::model::ReferenceDocument]),
        (status = 500, description = "Internal server error")
    ),
    tag = "corpus"
)]
#[get("/v1/corpus")]
pub async fn list_corpus(
    service: web::Data<CorpusService>,
    query: web::Query<ListCorpusParams>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let documents = service
        .list(ListCorpusQuery {
            country: query.country,
            category: query.category,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;
    Ok(HttpResponse::Ok().json(documents))
}

/// Delete a reference document
#[utoipa::path(
    delete,
    path = "/v1/corpus/{id}",
    params(("id" = i64, Path, description = "Reference document ID")),
    responses(
        (status = 204, description = "Reference document deleted"),
        (status = 404, description = "Reference document not found")
    ),
    tag = "corpus"
)]
#[delete("/v1/corpus/{id}")]
pub async fn delete_reference(
    service: web::Data<CorpusService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let actor = actor_from(&req);
    service.delete(path.into_inner(), &actor).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Similarity search over the embedded corpus
#[utoipa::path(
    post,
    path = "/v1/corpus/search",
    request_body = SearchCorpusRequest,
    responses(
        (status = 200, description = "Search hits", body = [SearchHit]),
        (status = 400, description = "Invalid request"),
        (status = 502, description = "Embedding provider failure")
    ),
    tag = "corpus"
)]
#[post("/v1/corpus/search")]
pub async fn search_corpus(
    service: web::Data<CorpusService>,
    body: web::Json<SearchCorpusRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let hits = service
        .search(&body.query, &body.country, body.category.as_deref())
        .await?;

    let out: Vec<SearchHit> = hits
        .into_iter()
        .map(|hit| SearchHit {
            id: hit.id,
            filename: hit.filename,
            category: hit.category,
            similarity: hit.similarity,
            excerpt: hit.text.chars().take(EXCERPT_CHARS).collect(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(out))
}

/// Configure corpus routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_reference)
        .service(list_corpus)
        .service(delete_reference)
        .service(search_corpus);
}
