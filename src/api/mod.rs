//! HTTP API layer

pub mod analysis;
pub mod audit;
pub mod claims;
pub mod corpus;
pub mod error;
pub mod health;
pub mod openapi;
pub mod recovery;
pub mod review;

use actix_web::HttpRequest;

const ACTOR_HEADER: &str = "x-actor";
const DEFAULT_ACTOR: &str = "operator";

/// Actor attributed in the audit trail, taken from the `x-actor` header.
/// Authentication happens upstream; this service records whoever the
/// gateway says is calling.
pub fn actor_from(req: &HttpRequest) -> String {
    req.headers()
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}
