use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::error_response;

/// Failures surfaced by the resource layer. Each variant maps to exactly one
/// HTTP status; see [`ResourceError::status`].
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ResourceError {
    pub fn status(&self) -> StatusCode {
        use ResourceError::*;
        match self {
            InvalidArgument(_) => StatusCode::BAD_REQUEST,
            NotFound(_) => StatusCode::NOT_FOUND,
            Conflict(_) => StatusCode::CONFLICT,
            Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<libsql::Error> for ResourceError {
    fn from(error: libsql::Error) -> Self {
        ResourceError::Unexpected(error.into())
    }
}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ResourceError::Unexpected(e) => {
                tracing::error!(error = %crate::unpack_error(&*e), "unexpected failure");
                error_response(status, "internal server error")
            }
            other => error_response(status, &other.to_string()),
        }
    }
}

/// True when the store rejected a statement because of a foreign key.
pub fn is_foreign_key_violation(error: &libsql::Error) -> bool {
    error.to_string().contains("FOREIGN KEY constraint failed")
}
