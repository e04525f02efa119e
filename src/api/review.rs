//! REST API endpoints for the two human review gates

use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::actor_from;
use crate::api::error::ApiError;
use crate::model::{ClaimDocument, ClaimStatus};
use crate::service::ClaimService;

/// One document's text under review
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewDocument {
    pub id: i64,
    pub filename: String,
    pub text: Option<String>,
    pub reviewed_by: Option<String>,
}

/// Texts presented at a review gate
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub claim_id: i64,
    pub status: ClaimStatus,
    pub documents: Vec<ReviewDocument>,
}

/// Text replacement for one document
#[derive(Debug, Deserialize, ToSchema)]
pub struct EditTextRequest {
    pub text: String,
}

/// Gate approval result
#[derive(Debug, Serialize, ToSchema)]
pub struct ApprovalResponse {
    pub claim_id: i64,
    pub status: ClaimStatus,
}

fn extraction_view(doc: &ClaimDocument) -> ReviewDocument {
    ReviewDocument {
        id: doc.id,
        filename: doc.filename.clone(),
        text: doc.raw_text.clone(),
        reviewed_by: doc.extraction_reviewed_by.clone(),
    }
}

fn deident_view(doc: &ClaimDocument) -> ReviewDocument {
    ReviewDocument {
        id: doc.id,
        filename: doc.filename.clone(),
        text: doc.deidentified_text.clone(),
        reviewed_by: doc.deident_reviewed_by.clone(),
    }
}

/// Extracted texts for review
#[utoipa::path(
    get,
    path = "/v1/claims/{id}/extraction",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Extraction texts", body = ReviewResponse),
        (status = 404, description = "Claim not found")
    ),
    tag = "review"
)]
#[get("/v1/claims/{id}/extraction")]
pub async fn get_extraction(
    service: web::Data<ClaimService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let (claim, docs) = service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ReviewResponse {
        claim_id: claim.id,
        status: claim.status,
        documents: docs.iter().map(extraction_view).collect(),
    }))
}

/// Correct one document's extracted text
#[utoipa::path(
    put,
    path = "/v1/claims/{id}/extraction/{document_id}",
    params(
        ("id" = i64, Path, description = "Claim ID"),
        ("document_id" = i64, Path, description = "Document ID")
    ),
    request_body = EditTextRequest,
    responses(
        (status = 204, description = "Text updated"),
        (status = 400, description = "Claim not in extraction review"),
        (status = 404, description = "Claim or document not found")
    ),
    tag = "review"
)]
#[put("/v1/claims/{id}/extraction/{document_id}")]
pub async fn edit_extraction(
    service: web::Data<ClaimService>,
    path: web::Path<(i64, i64)>,
    body: web::Json<EditTextRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let (claim_id, document_id) = path.into_inner();
    let actor = actor_from(&req);
    service
        .edit_extraction(claim_id, document_id, &body.text, &actor)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Approve extraction and start cleaning
#[utoipa::path(
    post,
    path = "/v1/claims/{id}/extraction/approve",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Extraction approved", body = ApprovalResponse),
        (status = 400, description = "Claim not in extraction review"),
        (status = 404, description = "Claim not found")
    ),
    tag = "review"
)]
#[post("/v1/claims/{id}/extraction/approve")]
pub async fn approve_extraction(
    service: web::Data<ClaimService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let claim_id = path.into_inner();
    let actor = actor_from(&req);
    let status = service.approve_extraction(claim_id, &actor).await?;
    Ok(HttpResponse::Ok().json(ApprovalResponse { claim_id, status }))
}

/// De-identified texts for review
#[utoipa::path(
    get,
    path = "/v1/claims/{id}/deidentification",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "De-identified texts", body = ReviewResponse),
        (status = 404, description = "Claim not found")
    ),
    tag = "review"
)]
#[get("/v1/claims/{id}/deidentification")]
pub async fn get_deidentification(
    service: web::Data<ClaimService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let (claim, docs) = service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ReviewResponse {
        claim_id: claim.id,
        status: claim.status,
        documents: docs.iter().map(deident_view).collect(),
    }))
}

/// Correct one document's de-identified text
#[utoipa::path(
    put,
    path = "/v1/claims/{id}/deidentification/{document_id}",
    params(
        ("id" = i64, Path, description = "Claim ID"),
        ("document_id" = i64, Path, description = "Document ID")
    ),
    request_body = EditTextRequest,
    responses(
        (status = 204, description = "Text updated"),
        (status = 400, description = "Claim not in de-identification review"),
        (status = 404, description = "Claim or document not found")
    ),
    tag = "review"
)]
#[put("/v1/claims/{id}/deidentification/{document_id}")]
pub async fn edit_deidentification(
    service: web::Data<ClaimService>,
    path: web::Path<(i64, i64)>,
    body: web::Json<EditTextRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let (claim_id, document_id) = path.into_inner();
    let actor = actor_from(&req);
    service
        .edit_deidentified(claim_id, document_id, &body.text, &actor)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Approve de-identification, making the claim ready for analysis
#[utoipa::path(
    post,
    path = "/v1/claims/{id}/deidentification/approve",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "De-identification approved", body = ApprovalResponse),
        (status = 400, description = "Claim not in de-identification review"),
        (status = 404, description = "Claim not found")
    ),
    tag = "review"
)]
#[post("/v1/claims/{id}/deidentification/approve")]
pub async fn approve_deidentification(
    service: web::Data<ClaimService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let claim_id = path.into_inner();
    let actor = actor_from(&req);
    let status = service.approve_deidentification(claim_id, &actor).await?;
    Ok(HttpResponse::Ok().json(ApprovalResponse { claim_id, status }))
}

/// Configure review gate routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_extraction)
        .service(edit_extraction)
        .service(approve_extraction)
        .service(get_deidentification)
        .service(edit_deidentification)
        .service(approve_deidentification);
}
