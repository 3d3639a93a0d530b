//! HTTP API: upload a video, process it, fetch key frames.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tokio::{fs, io::AsyncWriteExt};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use vidbrief_core::{
    ModelStatus, Pipeline, SummaryResult,
    storage::{allowed_file, resolve_in, secure_filename},
};

/// Largest accepted request body
pub const MAX_UPLOAD_BYTES: usize = 2000 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(pipeline: Pipeline, upload_dir: PathBuf) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            upload_dir,
        }
    }
}

/// A request-level failure, rendered as `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn upload_failed(e: impl std::fmt::Display) -> Self {
        error!(error = %e, "error in upload");
        Self::internal(format!("Upload failed: {e}"))
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        error!(error = %e, "error reading upload");
        Self::new(e.status(), format!("Upload failed: {}", e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub filename: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models: ModelStatus,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/upload", post(upload_file))
        .route("/api/summarize/{filename}", get(summarize_video))
        .route("/api/frames/{frame_name}", get(get_frame))
        .route("/api/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(addr: &str, state: AppState) -> std::io::Result<()> {
    fs::create_dir_all(&state.upload_dir).await?;
    info!(addr, upload_dir = %state.upload_dir.display(), "starting API server");

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await
}

/// Handler for `POST /api/upload`
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Ok(mut multipart) = multipart else {
        return Err(ApiError::bad_request("No file part"));
    };

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        // a part without a filename is a plain form value, not a file
        let Some(original) = field.file_name().map(str::to_string) else {
            continue;
        };
        if original.is_empty() {
            return Err(ApiError::bad_request("No selected file"));
        }
        if !allowed_file(&original) {
            warn!(filename = %original, "rejected upload with disallowed extension");
            return Err(ApiError::bad_request("File type not allowed"));
        }

        let filename = secure_filename(&original);
        if filename.is_empty() {
            return Err(ApiError::bad_request("No selected file"));
        }

        fs::create_dir_all(&state.upload_dir)
            .await
            .map_err(ApiError::upload_failed)?;
        let file_path = state.upload_dir.join(&filename);
        save_field(field, &file_path).await?;

        info!(filename, "file uploaded successfully");
        return Ok(Json(UploadResponse {
            status: "success",
            message: "File uploaded successfully",
            filename,
        }));
    }

    Err(ApiError::bad_request("No file part"))
}

/// Stream a multipart field to disk, removing the partial file on failure
async fn save_field(mut field: Field<'_>, path: &Path) -> Result<(), ApiError> {
    let mut file = fs::File::create(path)
        .await
        .map_err(ApiError::upload_failed)?;

    let written: Result<(), ApiError> = async {
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(ApiError::upload_failed)?;
        }
        file.flush().await.map_err(ApiError::upload_failed)
    }
    .await;

    if written.is_err() {
        drop(file);
        let _ = fs::remove_file(path).await;
    }
    written
}

/// Handler for `GET /api/summarize/{filename}`
pub async fn summarize_video(
    State(state): State<AppState>,
    axum::extract::Path(filename): axum::extract::Path<String>,
) -> Result<Json<SummaryResult>, ApiError> {
    let safe = secure_filename(&filename);
    let file_path = state.upload_dir.join(&safe);

    let is_file = !safe.is_empty()
        && fs::metadata(&file_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
    if !is_file {
        warn!(path = %file_path.display(), "file not found");
        return Err(ApiError::not_found("File not found"));
    }

    let pipeline = Arc::clone(&state.pipeline);
    let result = tokio::spawn(async move { pipeline.process(&file_path, &filename).await })
        .await
        .map_err(|e| {
            error!(error = %e, "error processing video");
            ApiError::internal(format!("Error processing video: {e}"))
        })?;

    Ok(Json(result))
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Handler for `GET /api/frames/{frame_name}`
pub async fn get_frame(
    State(state): State<AppState>,
    axum::extract::Path(frame_name): axum::extract::Path<String>,
) -> Result<Response, ApiError> {
    let Some(path) = resolve_in(&state.upload_dir, &frame_name) else {
        return Err(ApiError::not_found("File not found"));
    };

    let bytes = fs::read(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ApiError::not_found("File not found"),
        _ => {
            error!(error = %e, "error serving frame");
            ApiError::internal(format!("Error serving frame: {e}"))
        }
    })?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes).into_response())
}

/// Handler for `GET /api/health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        models: state.pipeline.model_status(),
    })
}
