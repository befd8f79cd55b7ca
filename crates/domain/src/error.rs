use thiserror::Error;

/// Result alias for document ingest.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while ingesting indicator documents.
#[derive(Debug, Error)]
pub enum Error {
    /// Two indicators in one document share a name.
    #[error("duplicate indicator name: {0}")]
    DuplicateIndicator(String),

    /// An indicator has no name.
    #[error("indicator at position {0} is missing a name")]
    MissingIndicatorName(usize),

    /// The product has no name.
    #[error("document is missing product name")]
    MissingProductName,

    /// An indicator has an empty promql expression.
    #[error("indicator {0} is missing a promql expression")]
    MissingPromql(String),

    /// The body was not a well-formed document.
    #[error("could not parse indicator document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
