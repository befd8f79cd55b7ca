use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, warn};

/// Reasons a request is refused by the gateway.
#[derive(Debug, Error)]
pub enum Error {
    /// Only reads are forwarded.
    #[error("method {0} is not allowed")]
    MethodNotAllowed(axum::http::Method),

    /// The request carried no token.
    #[error("no bearer token provided")]
    MissingToken,

    /// The token could not be checked, or UAA rejected it.
    #[error("token check failed: {0}")]
    TokenCheck(#[from] indicator_uaa::Error),

    /// The token carries none of the required scopes.
    #[error("token has none of the required scopes")]
    InsufficientScope,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Self::MethodNotAllowed(_) => {
                debug!(error = %self, "refused request");
                StatusCode::FORBIDDEN.into_response()
            }
            Self::TokenCheck(_) => {
                warn!(error = %self, "refused request");
                StatusCode::UNAUTHORIZED.into_response()
            }
            Self::MissingToken | Self::InsufficientScope => {
                debug!(error = %self, "refused request");
                StatusCode::UNAUTHORIZED.into_response()
            }
        }
    }
}
