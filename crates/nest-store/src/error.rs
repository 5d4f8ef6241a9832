/// Errors from feed store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A lock guarding the store or one of its slots was poisoned by a
    /// panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
