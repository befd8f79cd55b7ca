use thiserror::Error;

/// Errors that can occur setting up a producer.
#[derive(Debug, Error)]
pub enum Error {
    /// The event counter could not be registered.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// The loop was asked to tick with a zero interval.
    #[error("interval must be greater than zero")]
    ZeroInterval,
}
