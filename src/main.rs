mod config;
mod db;
mod domain;
mod error;
mod pdf;
mod routes;
mod state;
mod storage;
mod workflow;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "etica=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    let blobs = Arc::new(storage::FsBlobStore::new(
        config.blob_root.clone(),
        config.url_signing_key.clone(),
    ));
    blobs.ensure_root()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(pool.as_ref()).await?;

    let state = Arc::new(state::AppState {
        pool,
        config: config.clone(),
        blobs,
        renderers: Arc::new(pdf::forms::Renderers::standard()),
    });

    let app = Router::new()
        .route("/api/drafts", post(routes::create_draft))
        .route("/api/drafts/:draft_id", get(routes::get_draft))
        .route("/api/drafts/:draft_id/step", put(routes::update_draft_step))
        .route("/api/drafts/:draft_id/submit", post(routes::submit_draft))
        .route("/api/submissions", get(routes::list_submissions))
        .route("/api/submissions/:submission_id", get(routes::get_submission))
        .route("/api/submissions/:submission_id/documents", post(routes::upload_document))
        .route("/api/submissions/:submission_id/form", post(routes::update_form))
        .route(
            "/api/submissions/:submission_id/documents/:document_id/verify",
            post(routes::verify_document),
        )
        .route(
            "/api/submissions/:submission_id/documents/:document_id/undo",
            post(routes::undo_verification),
        )
        .route(
            "/api/submissions/:submission_id/complete-verification",
            post(routes::complete_verification),
        )
        .route("/api/submissions/:submission_id/classify", post(routes::classify))
        .route("/api/submissions/:submission_id/reviewers", post(routes::assign_reviewers))
        .route(
            "/api/submissions/:submission_id/reviewers/past",
            get(routes::past_reviewers),
        )
        .route("/api/submissions/:submission_id/revision", post(routes::request_revision))
        .route("/api/submissions/:submission_id/resubmit", post(routes::resubmit))
        .route("/api/submissions/:submission_id/decide", post(routes::decide))
        .route(
            "/api/submissions/:submission_id/consolidated",
            get(routes::get_consolidated),
        )
        .route(
            "/api/submissions/:submission_id/download_all",
            get(routes::download_all),
        )
        .route("/api/assignments/:assignment_id/review", post(routes::submit_review))
        .route(
            "/api/reviewers",
            get(routes::list_reviewers).post(routes::create_reviewer),
        )
        .route("/blob/*blob_ref", get(routes::fetch_blob))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Etica listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
