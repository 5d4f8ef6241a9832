use async_trait::async_trait;
use nest_types::FeedKey;

/// Stops background fetches on a feed before an optimistic write.
#[async_trait]
pub trait FetchQuiescer: Send + Sync {
    /// Cancel any in-flight fetch for `key` and wait until it has settled,
    /// either aborted or completed. Returns `true` if a fetch was in flight.
    async fn quiesce(&self, key: &FeedKey) -> bool;
}

/// Quiescer for setups without background fetching.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFetches;

#[async_trait]
impl FetchQuiescer for NoFetches {
    async fn quiesce(&self, _key: &FeedKey) -> bool {
        false
    }
}
