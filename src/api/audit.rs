//! REST API endpoints for the audit trail

use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::error::ApiError;
use crate::db::models::ListAuditQuery;
use crate::service::AuditRecorder;

/// Query parameters for listing audit entries
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListAuditParams {
    /// Filter by entity type (CLAIM, CLAIM_DOCUMENT, REFERENCE_DOCUMENT)
    pub entity_type: Option<String>,
    /// Filter by entity ID
    pub entity_id: Option<i64>,
    /// Filter by acting user
    pub actor: Option<String>,
    /// Filter by action code
    pub action: Option<String>,
    /// Maximum results (default: 100, max: 1000)
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// List audit entries, newest first
#[utoipa::path(
    get,
    path = "/v1/audit",
    params(ListAuditParams),
    responses(
        (status = 200, description = "Audit entries", body = [crate::model::AuditEntry]),
        (status = 500, description = "Internal server error")
    ),
    tag = "audit"
)]
#[get("/v1/audit")]
pub async fn list_audit(
    recorder: web::Data<AuditRecorder>,
    query: web::Query<ListAuditParams>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let entries = recorder
        .list(ListAuditQuery {
            entity_type: query.entity_type,
            entity_id: query.entity_id,
            actor: query.actor,
            action: query.action,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Complete audit trail for one claim, including its documents
#[utoipa::path(
    get,
    path = "/v1/claims/{id}/audit",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Claim audit trail", body = [crate::model::AuditEntry]),
        (status = 500, description = "Internal server error")
    ),
    tag = "audit"
)]
#[get("/v1/claims/{id}/audit")]
pub async fn claim_audit_trail(
    recorder: web::Data<AuditRecorder>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let entries = recorder.claim_trail(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Configure audit routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_audit).service(claim_audit_trail);
}
