use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The background task was already started.
    #[error("already started")]
    AlreadyStarted,

    /// The request body could not be read.
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    /// The registered document was rejected.
    #[error(transparent)]
    Document(#[from] indicator_domain::Error),

    /// A document file could not be read.
    #[error("{0}: {1}")]
    Io(String, #[source] std::io::Error),

    /// Metrics could not be registered or encoded.
    #[error(transparent)]
    Metrics(#[from] prometheus::Error),

    /// The registry could not be reached.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// The registry answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// Status returned by the registry.
        status: u16,

        /// Response body, for diagnostics.
        body: String,
    },

    /// A loop was asked to tick with a zero interval.
    #[error("interval must be greater than zero")]
    ZeroInterval,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Self::Body(_) | Self::Document(_) => {
                debug!(error = %self, "rejected request");
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            _ => {
                error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}
