//! Errors surfaced at the HTTP boundary

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid input (400)
    #[error("{0}")]
    Validation(String),

    /// Unknown resource (404)
    #[error("{0}")]
    NotFound(String),

    /// Catalog document could not be read or written (500)
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Asset I/O failure (500)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Storage(e) => match e.path() {
                Some(path) => tracing::error!("{} ({})", self, path.display()),
                None => tracing::error!("{}", self),
            },
            _ if status.is_server_error() => tracing::error!("{}", self),
            _ => {}
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
