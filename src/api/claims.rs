//! REST API endpoints for claim intake and lifecycle

use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::actor_from;
use crate::api::error::ApiError;
use crate::db::models::ListClaimsQuery;
use crate::model::{Claim, ClaimDocument, ClaimStatus};
use crate::service::{ClaimService, NewClaimDocument};

/// One document in a claim creation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadedDocument {
    pub filename: String,
    /// Base64-encoded file content
    pub content_base64: String,
}

/// Claim creation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClaimRequest {
    /// ISO country code the claim belongs to
    pub country: String,
    pub contract_number: Option<String>,
    pub documents: Vec<UploadedDocument>,
}

/// Summary of a document without its text payloads
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentSummary {
    pub id: i64,
    pub filename: String,
    pub has_raw_text: bool,
    pub has_cleaned_text: bool,
    pub has_deidentified_text: bool,
}

impl From<&ClaimDocument> for DocumentSummary {
    fn from(doc: &ClaimDocument) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            has_raw_text: doc.raw_text.is_some(),
            has_cleaned_text: doc.cleaned_text.is_some(),
            has_deidentified_text: doc.deidentified_text.is_some(),
        }
    }
}

/// Full claim representation with document summaries
#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimResponse {
    #[serde(flatten)]
    pub claim: Claim,
    pub documents: Vec<DocumentSummary>,
}

impl ClaimResponse {
    fn new(claim: Claim, docs: &[ClaimDocument]) -> Self {
        Self {
            claim,
            documents: docs.iter().map(DocumentSummary::from).collect(),
        }
    }
}

/// Query parameters for listing claims
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListClaimsParams {
    /// Filter by claim status
    pub status: Option<String>,
    /// Filter by country code
    pub country: Option<String>,
    /// Maximum results (default: 100, max: 500)
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// One row in the claim list
#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimSummary {
    #[serde(flatten)]
    pub claim: Claim,
    pub num_documents: i64,
}

/// Paginated claim list
#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimListResponse {
    pub claims: Vec<ClaimSummary>,
    pub total_count: i64,
}

/// Create a claim from uploaded documents and start the pipeline
#[utoipa::path(
    post,
    path = "/v1/claims",
    request_body = CreateClaimRequest,
    responses(
        (status = 201, description = "Claim created", body = ClaimResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    ),
    tag = "claims"
)]
#[post("/v1/claims")]
pub async fn create_claim(
    service: web::Data<ClaimService>,
    body: web::Json<CreateClaimRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let actor = actor_from(&req);
    let body = body.into_inner();

    let mut files = Vec::with_capacity(body.documents.len());
    for doc in body.documents {
        let content = BASE64.decode(&doc.content_base64).map_err(|_| {
            ApiError::Validation(format!("document {} is not valid base64", doc.filename))
        })?;
        files.push(NewClaimDocument {
            filename: doc.filename,
            content,
        });
    }

    let (claim, docs) = service
        .create(
            &body.country,
            body.contract_number.as_deref(),
            files,
            &actor,
        )
        .await?;

    Ok(HttpResponse::Created().json(ClaimResponse::new(claim, &docs)))
}

/// List claims with pagination and filters
#[utoipa::path(
    get,
    path = "/v1/claims",
    params(ListClaimsParams),
    responses(
        (status = 200, description = "Claims retrieved", body = ClaimListResponse),
        (status = 400, description = "Invalid status filter"),
        (status = 500, description = "Internal server error")
    ),
    tag = "claims"
)]
#[get("/v1/claims")]
pub async fn list_claims(
    service: web::Data<ClaimService>,
    query: web::Query<ListClaimsParams>,
) -> Result<HttpResponse, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            s.parse::<ClaimStatus>()
                .map_err(ApiError::Validation)?,
        ),
        None => None,
    };

    let paginated = service
        .list(ListClaimsQuery {
            status,
            country: query.country.clone(),
            limit: query.limit,
            offset: query.offset,
        })
        .await?;

    let claims = paginated
        .claims
        .into_iter()
        .map(|(claim, num_documents)| ClaimSummary {
            claim,
            num_documents,
        })
        .collect();

    Ok(HttpResponse::Ok().json(ClaimListResponse {
        claims,
        total_count: paginated.total_count,
    }))
}

/// Get a claim with its documents
#[utoipa::path(
    get,
    path = "/v1/claims/{id}",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Claim retrieved", body = ClaimResponse),
        (status = 404, description = "Claim not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "claims"
)]
#[get("/v1/claims/{id}")]
pub async fn get_claim(
    service: web::Data<ClaimService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let (claim, docs) = service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ClaimResponse::new(claim, &docs)))
}

/// Delete a claim and everything it owns
#[utoipa::path(
    delete,
    path = "/v1/claims/{id}",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 204, description = "Claim deleted"),
        (status = 404, description = "Claim not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "claims"
)]
#[delete("/v1/claims/{id}")]
pub async fn delete_claim(
    service: web::Data<ClaimService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let actor = actor_from(&req);
    service.delete(path.into_inner(), &actor).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Configure claim routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_claim)
        .service(list_claims)
        .service(get_claim)
        .service(delete_claim);
}
