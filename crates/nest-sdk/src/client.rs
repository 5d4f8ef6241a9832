use std::sync::Arc;

use nest_fetch::{FetchQuiescer, InfiniteScrollController, PageFetcher, ScrollOutcome};
use nest_mutation::{MutationOutcome, OptimisticMutationCoordinator, PostTransport, SubmitPost};
use nest_select::FeedQuerySelector;
use nest_store::{FeedCacheStore, InMemoryFeedStore};
use nest_types::{CachedFeedView, FeedKey, PostRecord};
use tracing::info;

use crate::backend::InMemoryFeedBackend;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// One client session: a feed cache plus the components that write to it.
///
/// The scroll controller and the mutation coordinator share the same store,
/// and the coordinator quiesces the controller's fetches before every
/// optimistic write.
pub struct FeedClient {
    config: ClientConfig,
    store: Arc<dyn FeedCacheStore>,
    scroll: Arc<InfiniteScrollController>,
    coordinator: OptimisticMutationCoordinator,
}

impl FeedClient {
    /// Build a client over a fresh in-memory feed cache.
    pub fn new(
        config: ClientConfig,
        fetcher: Arc<dyn PageFetcher>,
        transport: Arc<dyn PostTransport>,
    ) -> ClientResult<Self> {
        Self::with_store(config, Arc::new(InMemoryFeedStore::new()), fetcher, transport)
    }

    /// Build a client whose fetches and creates both go to `backend`.
    pub fn in_memory(config: ClientConfig, backend: Arc<InMemoryFeedBackend>) -> ClientResult<Self> {
        let fetcher: Arc<dyn PageFetcher> = backend.clone();
        Self::new(config, fetcher, backend)
    }

    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn FeedCacheStore>,
        fetcher: Arc<dyn PageFetcher>,
        transport: Arc<dyn PostTransport>,
    ) -> ClientResult<Self> {
        config.validate()?;
        let selector = Arc::new(FeedQuerySelector::from_config(&config.selector)?);
        let scroll = Arc::new(InfiniteScrollController::new(Arc::clone(&store), fetcher));
        let quiescer: Arc<dyn FetchQuiescer> = scroll.clone();
        let coordinator = OptimisticMutationCoordinator::new(
            Arc::clone(&store),
            selector,
            quiescer,
            transport,
            config.mutation.clone(),
        );
        info!(
            rules = config.selector.rules.len(),
            overlap = ?config.mutation.overlap,
            "feed client ready"
        );
        Ok(Self {
            config,
            store,
            scroll,
            coordinator,
        })
    }

    // ---- Reading ----

    /// Load (or refresh) the first page of a feed.
    pub async fn load(&self, key: &FeedKey) -> ScrollOutcome {
        self.scroll.load_first_page(key).await
    }

    /// Signal that the viewport is near the bottom of a feed.
    pub async fn near_bottom(&self, key: &FeedKey) -> ScrollOutcome {
        self.scroll.on_near_bottom(key).await
    }

    pub fn view(&self, key: &FeedKey) -> ClientResult<Option<CachedFeedView>> {
        Ok(self.store.get(key)?)
    }

    /// Every cached post of a feed, across pages, in display order. Empty
    /// when the feed is not cached.
    pub fn posts(&self, key: &FeedKey) -> ClientResult<Vec<PostRecord>> {
        Ok(self
            .store
            .get(key)?
            .map(|view| view.posts().cloned().collect())
            .unwrap_or_default())
    }

    pub fn has_next_page(&self, key: &FeedKey) -> ClientResult<bool> {
        Ok(self.scroll.has_next_page(key)?)
    }

    pub fn cached_feeds(&self) -> ClientResult<Vec<FeedKey>> {
        Ok(self.store.keys()?)
    }

    /// Drop a feed from the cache, cancelling its fetch first.
    pub async fn evict(&self, key: &FeedKey) -> ClientResult<Option<CachedFeedView>> {
        self.scroll.cancel(key).await;
        Ok(self.store.remove(key)?)
    }

    // ---- Writing ----

    /// Create a post optimistically across every affected cached feed.
    pub async fn submit(&self, post: SubmitPost) -> MutationOutcome {
        self.coordinator.submit(post).await
    }

    // ---- Accessors ----

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn scroll(&self) -> &InfiniteScrollController {
        &self.scroll
    }

    pub fn coordinator(&self) -> &OptimisticMutationCoordinator {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<dyn FeedCacheStore> {
        &self.store
    }
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("config", &self.config)
            .field("scroll", &self.scroll)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
