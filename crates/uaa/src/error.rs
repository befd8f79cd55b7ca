use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for UAA operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to UAA.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be sent or the response not decoded.
    #[error("uaa request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// The configured token lifetime cannot be added to the current time.
    #[error("token lifetime {0:?} is out of range")]
    TokenLifetime(std::time::Duration),

    /// UAA answered with something other than 200.
    #[error("uaa returned {status}: {body}")]
    UnexpectedStatus {
        /// The response status.
        status: StatusCode,

        /// The response body, for diagnostics.
        body: String,
    },
}
