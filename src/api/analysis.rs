//! REST API endpoints for claim analysis, results and reports

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::actor_from;
use crate::api::error::ApiError;
use crate::model::{AnalysisReport, ClaimStatus, Config};
use crate::service::ClaimService;

/// Analysis trigger request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Prompt template to use (default: "default")
    pub prompt_id: Option<String>,
}

/// Analysis trigger acknowledgement
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeResponse {
    pub claim_id: i64,
    pub prompt_id: String,
    pub queued: bool,
}

/// Stored analysis verdict for a claim
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalysisResultResponse {
    pub claim_id: i64,
    pub status: ClaimStatus,
    pub analysis_result: Option<serde_json::Value>,
    pub analysis_model: Option<String>,
}

/// One report with its download URL
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub download_url: String,
}

/// A selectable prompt template
#[derive(Debug, Serialize, ToSchema)]
pub struct PromptInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Queue analysis for a claim past both review gates
#[utoipa::path(
    post,
    path = "/v1/claims/{id}/analyze",
    params(("id" = i64, Path, description = "Claim ID")),
    request_body = AnalyzeRequest,
    responses(
        (status = 202, description = "Analysis queued", body = AnalyzeResponse),
        (status = 400, description = "Claim not ready or unknown prompt"),
        (status = 404, description = "Claim not found")
    ),
    tag = "analysis"
)]
#[post("/v1/claims/{id}/analyze")]
pub async fn analyze_claim(
    service: web::Data<ClaimService>,
    path: web::Path<i64>,
    body: web::Json<AnalyzeRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let claim_id = path.into_inner();
    let actor = actor_from(&req);
    let prompt_id = body
        .into_inner()
        .prompt_id
        .unwrap_or_else(|| "default".to_string());

    service.trigger_analysis(claim_id, &prompt_id, &actor).await?;

    Ok(HttpResponse::Accepted().json(AnalyzeResponse {
        claim_id,
        prompt_id,
        queued: true,
    }))
}

/// Stored analysis result for a claim
#[utoipa::path(
    get,
    path = "/v1/claims/{id}/analysis",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Analysis result", body = AnalysisResultResponse),
        (status = 404, description = "Claim not found")
    ),
    tag = "analysis"
)]
#[get("/v1/claims/{id}/analysis")]
pub async fn get_analysis(
    service: web::Data<ClaimService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let (claim, _) = service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(AnalysisResultResponse {
        claim_id: claim.id,
        status: claim.status,
        analysis_result: claim.analysis_result,
        analysis_model: claim.analysis_model,
    }))
}

/// Reports generated for a claim, newest first
#[utoipa::path(
    get,
    path = "/v1/claims/{id}/reports",
    params(("id" = i64, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Reports", body = [ReportResponse]),
        (status = 404, description = "Claim not found")
    ),
    tag = "analysis"
)]
#[get("/v1/claims/{id}/reports")]
pub async fn list_reports(
    service: web::Data<ClaimService>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let reports = service.reports(path.into_inner()).await?;
    let out: Vec<ReportResponse> = reports
        .into_iter()
        .map(|(report, download_url)| ReportResponse {
            report,
            download_url,
        })
        .collect();
    Ok(HttpResponse::Ok().json(out))
}

/// Available analysis prompt templates
#[utoipa::path(
    get,
    path = "/v1/prompts",
    responses(
        (status = 200, description = "Prompt templates", body = [PromptInfo])
    ),
    tag = "analysis"
)]
#[get("/v1/prompts")]
pub async fn list_prompts(config: web::Data<Config>) -> HttpResponse {
    let prompts: Vec<PromptInfo> = config
        .prompt_list()
        .into_iter()
        .map(|(id, name, description)| PromptInfo {
            id,
            name,
            description,
        })
        .collect();
    HttpResponse::Ok().json(prompts)
}

/// Configure analysis routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(analyze_claim)
        .service(get_analysis)
        .service(list_reports)
        .service(list_prompts);
}
