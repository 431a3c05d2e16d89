//! Static serving for the `/data` mount.
//!
//! Responses carry explicit CORS headers and an extension-based MIME type so
//! browsers render images directly from their logical URLs.

use std::path::Path as FsPath;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::api::AppState;
use crate::error::ServerError;

pub async fn serve_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let full_path = state.files.data_path(&path)?;
    if !full_path.exists() || full_path.is_dir() {
        return Err(ServerError::NotFound(format!("File not found: {path}")));
    }

    let data = tokio::fs::read(&full_path)
        .await
        .map_err(|e| ServerError::Internal(format!("Failed to read file: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, mime_for_extension(&full_path)),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        data,
    ))
}

/// MIME type inferred from the file extension, with a fallback for the
/// common image formats the frontend uploads.
fn mime_for_extension(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_inference_covers_image_formats() {
        assert_eq!(mime_for_extension(FsPath::new("a/b.PNG")), "image/png");
        assert_eq!(mime_for_extension(FsPath::new("c.jpeg")), "image/jpeg");
        assert_eq!(mime_for_extension(FsPath::new("d.svg")), "image/svg+xml");
        assert_eq!(
            mime_for_extension(FsPath::new("no_extension")),
            "application/octet-stream"
        );
    }
}
