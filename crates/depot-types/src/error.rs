use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid author: {0}")]
    InvalidAuthor(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
