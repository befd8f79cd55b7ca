/// Errors that stop a binary before or while it serves.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Flags that are individually valid but inconsistent together.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Indicator document error.
    #[error(transparent)]
    Document(#[from] indicator_domain::Error),

    /// TLS or HTTP plumbing error.
    #[error(transparent)]
    Http(#[from] indicator_http::Error),

    /// File or socket error.
    #[error("{0}: {1}")]
    Io(String, #[source] std::io::Error),

    /// Producer error.
    #[error(transparent)]
    Producer(#[from] indicator_producer::Error),

    /// Metrics store query error.
    #[error(transparent)]
    Promql(#[from] indicator_promql::Error),

    /// Registry error.
    #[error(transparent)]
    Registry(#[from] indicator_registry::Error),

    /// HTTP client construction error.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// One or more indicators returned no data.
    #[error("{0} indicator(s) failed verification")]
    Verification(usize),
}
