//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Scoring engine error
    #[error("Engine error: {0}")]
    Engine(#[from] placetrust_engine::EngineError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] placetrust_store::StoreError),

    /// External source error
    #[error("Source error: {0}")]
    Source(#[from] placetrust_sources::SourceError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Profile change refused
    #[error("Profile error: {0}")]
    ProfileGuard(String),
}
