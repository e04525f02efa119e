//! REST API endpoints for recovery operations

use actix_web::{post, web, HttpRequest, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::actor_from;
use crate::api::error::ApiError;
use crate::model::ClaimStatus;
use crate::service::RecoveryService;

/// Retry acknowledgement
#[derive(Debug, Serialize, ToSchema)]
pub struct RetryResponse {
    pub claim_id: i64,
    pub status: ClaimStatus,
    /// Number of documents re-dispatched
    pub retried: usize,
}

/// Status after an administrative operation
#[derive(Debug, Serialize, ToSchema)]
pub struct RecoveryResponse {
    pub claim_id: i64,
    pub status: ClaimStatus,
}

/// Re-run the current stage for documents that never produced output
#[utoipa::path(
    post,
    path = "/v1/claims/{id}/retry",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Retry dispatched", body = RetryResponse),
        (status = 400, description = "Claim not in a retryable status"),
        (status = 404, description = "Claim not found")
    ),
    tag = "recovery"
)]
#[post("/v1/claims/{id}/retry")]
pub async fn retry_claim(
    service: web::Data<RecoveryService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let claim_id = path.into_inner();
    let actor = actor_from(&req);
    let outcome = service.retry(claim_id, &actor).await?;
    Ok(HttpResponse::Ok().json(RetryResponse {
        claim_id,
        status: outcome.status,
        retried: outcome.retried,
    }))
}

/// Move an analyzed or failed claim back to READY_FOR_ANALYSIS
#[utoipa::path(
    post,
    path = "/v1/claims/{id}/reset",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Claim reset", body = RecoveryResponse),
        (status = 400, description = "Claim not in a resettable status"),
        (status = 404, description = "Claim not found")
    ),
    tag = "recovery"
)]
#[post("/v1/claims/{id}/reset")]
pub async fn reset_claim(
    service: web::Data<RecoveryService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let claim_id = path.into_inner();
    let actor = actor_from(&req);
    let status = service.reset(claim_id, &actor).await?;
    Ok(HttpResponse::Ok().json(RecoveryResponse { claim_id, status }))
}

/// Wipe derived texts and restart the pipeline from cleaning
#[utoipa::path(
    post,
    path = "/v1/claims/{id}/re-clean",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Re-clean dispatched", body = RecoveryResponse),
        (status = 404, description = "Claim not found")
    ),
    tag = "recovery"
)]
#[post("/v1/claims/{id}/re-clean")]
pub async fn re_clean_claim(
    service: web::Data<RecoveryService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let claim_id = path.into_inner();
    let actor = actor_from(&req);
    let status = service.re_clean(claim_id, &actor).await?;
    Ok(HttpResponse::Ok().json(RecoveryResponse { claim_id, status }))
}

/// Configure recovery routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(retry_claim)
        .service(reset_claim)
        .service(re_clean_claim);
}
