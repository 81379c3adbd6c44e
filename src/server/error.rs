//! Errors answered by the HTTP handlers

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::ContentError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A required query parameter is absent or empty
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    /// The content repository failed or answered garbage
    #[error("content repository error: {0}")]
    Content(#[from] ContentError),

    /// Rendering or writing a page failed
    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ContentError>() {
            Ok(content) => ServerError::Content(content),
            Err(other) => ServerError::Internal(other),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::Content(err) => {
                tracing::error!(error = %err, "content repository error");
                StatusCode::BAD_GATEWAY
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
