use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use cardforge_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// A required field failed validation.  Carries the field-specific message.
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedMedia(String),

    #[error("File too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::UnsupportedMedia(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::FileTooLarge { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            // A missing row surfaced directly from the store is a client
            // error; everything else stays generic.
            ServerError::Store(StoreError::NotFound) => {
                (StatusCode::NOT_FOUND, "Record not found".to_string())
            }
            ServerError::Store(e) => {
                tracing::error!(error = %e, "store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            ServerError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "success": false,
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
