use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for PromQL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur querying the metrics store.
#[derive(Debug, Error)]
pub enum Error {
    /// The store answered with `status: error`.
    #[error("query failed ({error_type}): {error}")]
    Api {
        /// Prometheus error class, e.g. `bad_data`.
        error_type: String,

        /// Human readable reason.
        error: String,
    },

    /// The response body was not a query result.
    #[error("could not decode query response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The result was not a matrix.
    #[error("could not assert result as Matrix")]
    NotMatrix,

    /// The result was not an instant vector.
    #[error("could not assert result as Vector")]
    NotVector,

    /// The request failed or hit its deadline.
    #[error("query request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// No authorization header could be obtained.
    #[error("could not acquire token: {0}")]
    Token(#[from] indicator_uaa::Error),

    /// A non-2xx response without a Prometheus error body.
    #[error("metrics store returned {status}: {body}")]
    UnexpectedStatus {
        /// The response status.
        status: StatusCode,

        /// The response body, for diagnostics.
        body: String,
    },
}
