//! OpenAPI specification endpoints

use actix_web::{get, HttpResponse, Responder};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Claims Pipeline API",
        description = "Insurance claim document pipeline: intake, review gates, de-identification and LLM analysis"
    ),
    paths(
        crate::api::claims::create_claim,
        crate::api::claims::list_claims,
        crate::api::claims::get_claim,
        crate::api::claims::delete_claim,
        crate::api::review::get_extraction,
        crate::api::review::edit_extraction,
        crate::api::review::approve_extraction,
        crate::api::review::get_deidentification,
        crate::api::review::edit_deidentification,
        crate::api::review::approve_deidentification,
        crate::api::analysis::analyze_claim,
        crate::api::analysis::get_analysis,
        crate::api::analysis::list_reports,
        crate::api::analysis::list_prompts,
        crate::api::recovery::retry_claim,
        crate::api::recovery::reset_claim,
        crate::api::recovery::re_clean_claim,
        crate::api::audit::list_audit,
        crate::api::audit::claim_audit_trail,
        crate::api::corpus::upload_reference,
        crate::api::corpus::list_corpus,
        crate::api::corpus::delete_reference,
        crate::api::corpus::search_corpus,
        crate::api::health::liveness,
        crate::api::health::readiness,
    ),
    components(schemas(
        crate::model::Claim,
        crate::model::ClaimDocument,
        crate::model::ClaimStatus,
        crate::model::AnalysisReport,
        crate::model::AuditEntry,
        crate::model::AuditAction,
        crate::model::AuditEntityType,
        crate::model::ReferenceDocument,
        crate::api::error::ErrorResponse,
    )),
    tags(
        (name = "claims", description = "Claim intake and lifecycle"),
        (name = "review", description = "Human review gates"),
        (name = "analysis", description = "LLM claim analysis and reports"),
        (name = "recovery", description = "Retry, reset and re-clean"),
        (name = "audit", description = "Audit trail"),
        (name = "corpus", description = "Reference document corpus"),
        (name = "health", description = "Health probes"),
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Serve OpenAPI YAML specification
#[get("/openapi.yaml")]
pub async fn openapi_yaml() -> impl Responder {
    match ApiDoc::openapi().to_yaml() {
        Ok(yaml) => HttpResponse::Ok().content_type("text/yaml").body(yaml),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render OpenAPI YAML");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(openapi_json).service(openapi_yaml);
}
