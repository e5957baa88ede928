//! Error types for engine operations

use thiserror::Error;

/// Errors that can occur while scoring places
#[derive(Error, Debug)]
pub enum EngineError {
    /// No review page could be fetched
    #[error("Source error: {0}")]
    Source(String),

    /// The fold was aborted by the scorer failure policy
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
