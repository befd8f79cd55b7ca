use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

/// Errors that can occur while preparing a broadcast.
#[derive(Debug, Error)]
pub enum Error {
    /// The request body could not be read.
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    /// A copy of the request could not be built.
    #[error("failed to copy request: {0}")]
    Copy(#[from] axum::http::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Self::Body(_) => {
                debug!(error = %self, "rejected request");
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            Self::Copy(_) => {
                error!(error = %self, "failed to prepare broadcast");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
