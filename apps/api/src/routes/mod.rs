pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::resume::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Resume API
        .route("/api/v1/resumes/parse", post(handlers::handle_parse))
        .route("/api/v1/resumes/tailor", post(handlers::handle_tailor_document))
        .route("/api/v1/resumes/tailor/json", post(handlers::handle_tailor_json))
        .route("/api/v1/resumes/upload", post(handlers::handle_upload))
        .layer(body_limit)
        .with_state(state)
}
