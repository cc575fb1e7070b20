//! Route modules for the PDF template server

pub mod downloads;
pub mod health;
pub mod templates;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config().storage.max_upload_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .merge(templates::router(max_upload_bytes))
        .merge(downloads::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
