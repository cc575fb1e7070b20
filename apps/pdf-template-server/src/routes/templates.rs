//! Template routes
//!
//! Endpoints:
//! - POST /upload-template - Store a PDF template and list its placeholders
//! - POST /generate-pdf - Fill a stored template and stage the result
//! - POST /generate-template - Build a single page from free text

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        State,
    },
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::pdf::{self, PageSize};
use crate::state::AppState;
use crate::storage::ArtifactKind;
use crate::template::{self, FieldValues};

/// Multipart field carrying the template
const TEMPLATE_FIELD: &str = "pdf";

/// Create the template router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload-template", post(upload_template))
        .route("/generate-pdf", post(generate_pdf))
        .route("/generate-template", post(generate_template))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: &'static str,
    pub file_path: String,
    pub placeholders: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateTemplateRequest {
    #[serde(default)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub message: &'static str,
    pub download_path: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /upload-template
///
/// Store the uploaded PDF and return the placeholders found in its text.
async fn upload_template(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected upload body: {}", e);
        no_file()
    })?;

    let mut data = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::ProcessingFailure(format!("Failed to read upload: {}", e))
    })? {
        if field.name() != Some(TEMPLATE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(|s| s.to_string());
        let bytes = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read file data: {}", e);
            AppError::ProcessingFailure(format!("Failed to read file data: {}", e))
        })?;

        tracing::debug!(filename = ?filename, size = bytes.len(), "Received template upload");
        data = Some(bytes);
        break;
    }

    let data = data.ok_or_else(no_file)?;
    let stored = state.templates().save(&data).await?;

    let extracted = tokio::task::spawn_blocking(move || pdf::extract_text(&data)).await?;
    let text = match extracted {
        Ok(text) => text,
        Err(e) => {
            // An unreadable template is useless later, do not keep it around
            if let Err(remove_err) = state.templates().remove(&stored.file_path).await {
                tracing::warn!(error = %remove_err, "Failed to remove unreadable template");
            }
            return Err(e.into());
        }
    };

    let placeholders = template::scan(&text);

    tracing::info!(
        template_id = %stored.id,
        placeholders = placeholders.len(),
        "Template uploaded"
    );

    Ok(Json(UploadResponse {
        message: "File uploaded successfully",
        file_path: stored.file_path,
        placeholders,
    }))
}

/// POST /generate-pdf
///
/// Substitute `data` into the template's text and re-render its first page.
async fn generate_pdf(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>> {
    let request = payload.map(|Json(request)| request).map_err(|e| {
        tracing::debug!("Rejected generate body: {}", e);
        missing_parameters()
    })?;

    let file_path = request
        .file_path
        .filter(|path| !path.is_empty())
        .ok_or_else(missing_parameters)?;
    let values = request
        .data
        .map(field_values)
        .ok_or_else(missing_parameters)?;

    let template_bytes = state.templates().read(&file_path).await?;

    let rendered = tokio::task::spawn_blocking(move || {
        let text = pdf::extract_text(&template_bytes)?;
        let filled = template::substitute(&text, &values);
        pdf::render_over(&template_bytes, &filled)
    })
    .await??;

    let id = state
        .artifacts()
        .store(ArtifactKind::Processed, &rendered)
        .await?;

    if state.config().retention.delete_template_after_generate {
        if let Err(e) = state.templates().remove(&file_path).await {
            tracing::warn!(error = %e, "Failed to remove template after generation");
        }
    }

    tracing::info!(artifact_id = %id, size = rendered.len(), "PDF generated");

    Ok(Json(GenerateResponse {
        message: "PDF generated successfully",
        download_path: state.download_url(ArtifactKind::Processed, id),
    }))
}

/// POST /generate-template
///
/// Build a fresh page containing `input` verbatim.
async fn generate_template(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateTemplateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>> {
    let input = payload
        .ok()
        .and_then(|Json(request)| request.input)
        .filter(|input| !input.is_empty())
        .ok_or_else(|| AppError::MissingInput("Input text is required".to_string()))?;

    let rendered =
        tokio::task::spawn_blocking(move || pdf::render_fresh(PageSize::TEMPLATE, &input))
            .await??;

    let id = state
        .artifacts()
        .store(ArtifactKind::Template, &rendered)
        .await?;

    tracing::info!(artifact_id = %id, size = rendered.len(), "Template generated");

    Ok(Json(GenerateResponse {
        message: "Template generated successfully",
        download_path: state.download_url(ArtifactKind::Template, id),
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn no_file() -> AppError {
    AppError::MissingInput("No file uploaded".to_string())
}

fn missing_parameters() -> AppError {
    AppError::MissingInput("Missing required parameters".to_string())
}

/// Convert the JSON `data` object to field values, keeping the client's order.
///
/// Strings are used as-is; any other JSON value is inserted as its JSON text.
fn field_values(data: Map<String, Value>) -> FieldValues {
    data.into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (name, value)
        })
        .collect()
}
