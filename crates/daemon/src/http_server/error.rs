use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use common::auth::{AccessError, Rejection};
use common::share::ShareError;
use common::volume::PathError;

/// The error every volume and account handler returns.
///
/// Only generic messages reach the wire. The detailed reason is logged.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("access denied: {0}")]
    Access(#[from] AccessError),
    #[error("not found")]
    NotFound,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Access(err) => match err.rejection() {
                Rejection::Unauthorized => StatusCode::UNAUTHORIZED,
                Rejection::NotFound => StatusCode::NOT_FOUND,
            },
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PathError> for ApiError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Escape(path) => {
                tracing::info!(path, "path escapes volume root");
                ApiError::Access(AccessError::PathEscape)
            }
            PathError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ApiError::NotFound,
            PathError::Io(e) => ApiError::internal(e),
        }
    }
}

impl<T: std::fmt::Display> From<ShareError<T>> for ApiError {
    fn from(err: ShareError<T>) -> Self {
        match err {
            ShareError::NotFound => ApiError::NotFound,
            ShareError::InvalidPath(path) => {
                tracing::info!(path, "refusing to share invalid path");
                ApiError::Access(AccessError::PathEscape)
            }
            err => ApiError::internal(err),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::internal(err)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self {
            ApiError::Access(err) => {
                tracing::debug!(error = %err, "request rejected");
                match err.rejection() {
                    Rejection::Unauthorized => "unauthorized".to_string(),
                    Rejection::NotFound => "not found".to_string(),
                }
            }
            ApiError::NotFound => "not found".to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                "something went wrong".to_string()
            }
        };
        (status, Json(serde_json::json!({ "msg": msg }))).into_response()
    }
}
