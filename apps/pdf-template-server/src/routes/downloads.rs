//! Download routes
//!
//! Serves staged artifacts once. The file is removed as part of serving it,
//! so a second request for the same id gets a 404.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::{ArtifactKind, StorageError};

/// Create the downloads router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/download-pdf", get(download_pdf))
        .route("/download-template", get(download_template))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub id: Option<String>,
}

/// GET /download-pdf?id=<uuid>
async fn download_pdf(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    serve_artifact(&state, ArtifactKind::Processed, query).await
}

/// GET /download-template?id=<uuid>
async fn download_template(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    serve_artifact(&state, ArtifactKind::Template, query).await
}

/// Take the artifact out of storage and send it as an attachment
async fn serve_artifact(
    state: &AppState,
    kind: ArtifactKind,
    query: DownloadQuery,
) -> Result<Response> {
    let raw_id = query
        .id
        .ok_or_else(|| AppError::MissingInput("Missing download id".to_string()))?;
    let id = Uuid::try_parse(&raw_id).map_err(|_| StorageError::InvalidId(raw_id.clone()))?;

    let data = state.artifacts().take(kind, id).await?;
    let size = data.len();

    tracing::info!(artifact_id = %id, size, filename = kind.download_name(), "Artifact downloaded");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", kind.download_name()),
        )
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(data))
        .map_err(|e| AppError::ProcessingFailure(e.to_string()))
}
