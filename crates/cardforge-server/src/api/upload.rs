//! Generic file upload and raw file access endpoints.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::api::AppState;
use crate::error::ServerError;
use crate::schemas::{MessageResponse, MultipleUploadResponse, UploadResponse, UploadedFileResult};

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub subdirectory: Option<String>,
}

pub async fn single(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {e}")))?;

            let saved = state
                .files
                .save(&data, &filename, params.subdirectory.as_deref(), None)
                .await?;

            info!(url = %saved.url, size = data.len(), "File uploaded");

            return Ok(Json(UploadResponse {
                success: true,
                message: "File uploaded successfully.".to_string(),
                file_url: Some(saved.url),
                filename: Some(saved.filename),
            }));
        }
    }

    Err(ServerError::BadRequest(
        "Missing 'file' field in multipart form".to_string(),
    ))
}

pub async fn multiple(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<MultipleUploadResponse>, ServerError> {
    let mut uploaded = Vec::new();
    let mut failed = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {e}")))?
    {
        if !matches!(field.name(), Some("file") | Some("files")) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                failed.push(UploadedFileResult {
                    filename,
                    saved_filename: None,
                    file_url: None,
                    error: Some(format!("Failed to read field: {e}")),
                    success: false,
                });
                continue;
            }
        };

        match state
            .files
            .save(&data, &filename, params.subdirectory.as_deref(), None)
            .await
        {
            Ok(saved) => uploaded.push(UploadedFileResult {
                filename,
                saved_filename: Some(saved.filename),
                file_url: Some(saved.url),
                error: None,
                success: true,
            }),
            Err(e) => failed.push(UploadedFileResult {
                filename,
                saved_filename: None,
                file_url: None,
                error: Some(e.to_string()),
                success: false,
            }),
        }
    }

    if uploaded.is_empty() {
        let detail = failed
            .first()
            .and_then(|f| f.error.clone())
            .unwrap_or_else(|| "No files in multipart form".to_string());
        return Err(ServerError::BadRequest(format!(
            "All file uploads failed: {detail}"
        )));
    }

    let message = if failed.is_empty() {
        format!("{} file(s) uploaded.", uploaded.len())
    } else {
        format!("{} file(s) uploaded ({} failed).", uploaded.len(), failed.len())
    };

    let mut files = uploaded;
    files.extend(failed);

    Ok(Json(MultipleUploadResponse {
        success: true,
        message,
        files,
    }))
}

/// Fetch a stored file by its path relative to the upload root.
pub async fn fetch(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let full_path = state.files.full_path(&path)?;
    if !full_path.exists() {
        return Err(ServerError::NotFound(format!("File not found: {path}")));
    }

    let data = tokio::fs::read(&full_path)
        .await
        .map_err(|e| ServerError::Internal(format!("Failed to read file: {e}")))?;

    let filename = full_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{filename}\""),
            ),
        ],
        data,
    ))
}

/// Delete a stored file by its path relative to the upload root.
pub async fn remove(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    let full_path = state.files.full_path(&path)?;
    if !full_path.exists() {
        return Err(ServerError::NotFound(format!("File not found: {path}")));
    }

    if !state.files.delete(&full_path).await {
        return Err(ServerError::Internal(format!(
            "Failed to delete file: {path}"
        )));
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "File deleted successfully.".to_string(),
    }))
}
