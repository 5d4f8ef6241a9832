use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid feed key: {0}")]
    InvalidFeedKey(String),

    #[error("invalid temp id: {0}")]
    InvalidTempId(String),
}
