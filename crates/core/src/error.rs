//! Identifier error model.

use thiserror::Error;

/// Failure to build an identifier from external input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// A value failed validation (e.g. empty tenant key).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl IdError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
