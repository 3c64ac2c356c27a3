//! Security-specific error types.

use thiserror::Error;

/// Security-related errors.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Permission denied for the requested operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid capability string format.
    #[error("invalid capability format: {0}")]
    InvalidCapabilityFormat(String),
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;
