//! Error types for wallet-pulse

use thiserror::Error;

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error (missing or invalid values, fatal at startup)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// RPC/Solana error (transient, isolated per call)
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Transaction payload could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed subscriber frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error should abort startup when hit during initialization
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
