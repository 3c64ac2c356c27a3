//! Server error types.

use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Store or model error.
    #[error("storage error: {0}")]
    Storage(#[from] ldapback_core::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ldapback_proto::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, Error>;
