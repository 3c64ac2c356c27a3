//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Search filter could not be parsed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Distinguished name is malformed.
    #[error("invalid distinguished name: {0}")]
    InvalidDn(String),
}
