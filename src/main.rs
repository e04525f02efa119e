use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod db;
mod model;
mod provider;
mod service;

use app::AppState;
use model::Config;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    let state = AppState::new(config)
        .await
        .unwrap_or_else(|e| panic!("Failed to initialize application: {}", e));

    let db_pool = web::Data::new(state.db_pool);
    let app_config = web::Data::new(state.config);
    let claim_service = web::Data::new(state.claim_service);
    let corpus_service = web::Data::new(state.corpus_service);
    let recovery_service = web::Data::new(state.recovery_service);
    let audit_recorder = web::Data::new(state.audit_recorder);

    tracing::info!("Starting claims pipeline server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(db_pool.clone())
            .app_data(app_config.clone())
            .app_data(claim_service.clone())
            .app_data(corpus_service.clone())
            .app_data(recovery_service.clone())
            .app_data(audit_recorder.clone())
            .configure(api::claims::configure)
            .configure(api::review::configure)
            .configure(api::analysis::configure)
            .configure(api::recovery::configure)
            .configure(api::audit::configure)
            .configure(api::corpus::configure)
            .configure(api::health::configure)
            .configure(api::openapi::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
