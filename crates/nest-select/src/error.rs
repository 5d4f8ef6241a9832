/// Errors raised while building a selector.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectError {
    /// A configured rule is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type SelectResult<T> = Result<T, SelectError>;
