use nest_types::FeedKey;
use thiserror::Error;

/// A page fetch failed. The cached view is never modified when this is
/// returned.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("remote error: {0}")]
    Remote(String),

    #[error("unknown feed: {0}")]
    UnknownFeed(FeedKey),

    #[error("store error: {0}")]
    Store(#[from] nest_store::StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type FetchResult<T> = Result<T, FetchError>;
