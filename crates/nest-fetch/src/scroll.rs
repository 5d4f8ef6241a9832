use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nest_store::{FeedCacheStore, FeedCacheStoreExt};
use nest_types::{CachedFeedView, Cursor, FeedKey};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::fetcher::PageFetcher;
use crate::quiesce::FetchQuiescer;

/// Which page a fetch is for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchKind {
    /// The newest page; (re)creates the view.
    FirstPage,
    /// The page after `cursor`; appended to the view's tail.
    NextPage(Cursor),
}

/// Why a trigger did not start a fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A fetch for this feed is already outstanding.
    AlreadyFetching,
    /// The last fetched page was terminal.
    EndOfFeed,
    /// The feed has never been loaded; use the first-page load instead.
    NotLoaded,
    /// The page arrived but the view had moved on (recreated, removed, or
    /// already extended past the requested cursor), so it was discarded.
    Stale,
}

/// Result of one scroll trigger or first-page load.
#[derive(Debug)]
pub enum ScrollOutcome {
    FirstPageLoaded {
        key: FeedKey,
        post_count: usize,
        has_next_page: bool,
    },
    PageAppended {
        key: FeedKey,
        posts_added: usize,
        has_next_page: bool,
    },
    FetchFailed {
        key: FeedKey,
        error: FetchError,
    },
    Ignored(IgnoreReason),
    /// The fetch was cancelled before it settled; the view is unchanged.
    Cancelled {
        key: FeedKey,
    },
}

impl ScrollOutcome {
    /// `true` if the store was changed by this fetch.
    pub fn changed_view(&self) -> bool {
        matches!(
            self,
            Self::FirstPageLoaded { .. } | Self::PageAppended { .. }
        )
    }
}

struct InFlight {
    ticket: u64,
    handle: JoinHandle<()>,
}

/// Drives page growth for feed views from "near bottom" signals.
///
/// At most one fetch per feed is outstanding. Triggers that arrive while one
/// is running are ignored rather than queued. Every fetch runs as its own
/// task so it can be aborted by [`Self::cancel`]; the task writes its page
/// to the store in a single `update`, so an aborted fetch either appended
/// its whole page or nothing.
pub struct InfiniteScrollController {
    store: Arc<dyn FeedCacheStore>,
    fetcher: Arc<dyn PageFetcher>,
    in_flight: Mutex<HashMap<FeedKey, InFlight>>,
    next_ticket: AtomicU64,
}

impl InfiniteScrollController {
    pub fn new(store: Arc<dyn FeedCacheStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            store,
            fetcher,
            in_flight: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Load (or reload) the first page of `key`, replacing any cached view.
    pub async fn load_first_page(&self, key: &FeedKey) -> ScrollOutcome {
        self.run(key, FetchKind::FirstPage).await
    }

    /// React to the viewport nearing the bottom of `key`'s feed.
    pub async fn on_near_bottom(&self, key: &FeedKey) -> ScrollOutcome {
        if self.is_fetching(key) {
            debug!(key = %key, "scroll trigger ignored: fetch in flight");
            return ScrollOutcome::Ignored(IgnoreReason::AlreadyFetching);
        }
        let view = match self.store.get(key) {
            Ok(view) => view,
            Err(e) => {
                return ScrollOutcome::FetchFailed {
                    key: key.clone(),
                    error: e.into(),
                }
            }
        };
        let Some(view) = view else {
            return ScrollOutcome::Ignored(IgnoreReason::NotLoaded);
        };
        let Some(cursor) = view.next_cursor().cloned() else {
            debug!(key = %key, "scroll trigger ignored: end of feed");
            return ScrollOutcome::Ignored(IgnoreReason::EndOfFeed);
        };
        self.run(key, FetchKind::NextPage(cursor)).await
    }

    /// Whether a fetch for `key` is outstanding.
    pub fn is_fetching(&self, key: &FeedKey) -> bool {
        match self.in_flight.lock() {
            Ok(map) => map.get(key).is_some_and(|f| !f.handle.is_finished()),
            Err(_) => false,
        }
    }

    /// Whether the cached view of `key` has another page to fetch.
    pub fn has_next_page(&self, key: &FeedKey) -> FetchResult<bool> {
        Ok(self
            .store
            .get(key)?
            .is_some_and(|view| view.has_next_page()))
    }

    /// Abort the in-flight fetch for `key`, if any, and wait for it to
    /// settle. Returns `true` if a fetch was still running.
    pub async fn cancel(&self, key: &FeedKey) -> bool {
        let entry = match self.in_flight.lock() {
            Ok(mut map) => map.remove(key),
            Err(e) => {
                warn!(key = %key, error = %e, "in-flight table poisoned");
                None
            }
        };
        let Some(entry) = entry else {
            return false;
        };
        let running = !entry.handle.is_finished();
        entry.handle.abort();
        match entry.handle.await {
            Err(e) if e.is_cancelled() => {
                debug!(key = %key, ticket = entry.ticket, "fetch aborted");
            }
            Err(e) => {
                warn!(key = %key, ticket = entry.ticket, error = %e, "fetch task panicked");
            }
            Ok(()) => {
                debug!(key = %key, ticket = entry.ticket, "fetch settled before cancellation");
            }
        }
        running
    }

    async fn run(&self, key: &FeedKey, kind: FetchKind) -> ScrollOutcome {
        let (tx, rx) = oneshot::channel();
        let ticket = {
            let mut map = match self.in_flight.lock() {
                Ok(map) => map,
                Err(e) => {
                    return ScrollOutcome::FetchFailed {
                        key: key.clone(),
                        error: FetchError::Internal(e.to_string()),
                    }
                }
            };
            if map.get(key).is_some_and(|f| !f.handle.is_finished()) {
                return ScrollOutcome::Ignored(IgnoreReason::AlreadyFetching);
            }
            let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
            let store = Arc::clone(&self.store);
            let fetcher = Arc::clone(&self.fetcher);
            let task_key = key.clone();
            let handle = tokio::spawn(async move {
                let outcome = fetch_and_store(store.as_ref(), fetcher.as_ref(), task_key, kind).await;
                let _ = tx.send(outcome);
            });
            map.insert(key.clone(), InFlight { ticket, handle });
            ticket
        };
        debug!(key = %key, ticket, "fetch started");

        let outcome = rx.await.unwrap_or_else(|_| ScrollOutcome::Cancelled { key: key.clone() });
        self.release(key, ticket);
        outcome
    }

    fn release(&self, key: &FeedKey, ticket: u64) {
        if let Ok(mut map) = self.in_flight.lock() {
            if map.get(key).is_some_and(|f| f.ticket == ticket) {
                map.remove(key);
            }
        }
    }
}

async fn fetch_and_store(
    store: &dyn FeedCacheStore,
    fetcher: &dyn PageFetcher,
    key: FeedKey,
    kind: FetchKind,
) -> ScrollOutcome {
    let cursor = match &kind {
        FetchKind::FirstPage => None,
        FetchKind::NextPage(cursor) => Some(cursor),
    };
    let page = match fetcher.fetch_page(&key, cursor).await {
        Ok(page) => page,
        Err(error) => {
            warn!(key = %key, error = %error, "page fetch failed");
            return ScrollOutcome::FetchFailed { key, error };
        }
    };

    match kind {
        FetchKind::FirstPage => {
            let view = CachedFeedView::from_first_page(page);
            let post_count = view.post_count();
            let has_next_page = view.has_next_page();
            if let Err(e) = store.put(&key, view) {
                return ScrollOutcome::FetchFailed { key, error: e.into() };
            }
            debug!(key = %key, post_count, "first page loaded");
            ScrollOutcome::FirstPageLoaded {
                key,
                post_count,
                has_next_page,
            }
        }
        FetchKind::NextPage(cursor) => {
            let incoming = page.posts.len();
            let mut appended = None;
            let result = store.update_with(&key, |view| {
                view.map(|mut view| {
                    if view.next_cursor() == Some(&cursor) {
                        let dropped = view.append_page(cursor, page);
                        appended = Some((incoming - dropped, view.has_next_page()));
                    }
                    view
                })
            });
            if let Err(e) = result {
                return ScrollOutcome::FetchFailed { key, error: e.into() };
            }
            match appended {
                Some((posts_added, has_next_page)) => {
                    debug!(key = %key, posts_added, has_next_page, "page appended");
                    ScrollOutcome::PageAppended {
                        key,
                        posts_added,
                        has_next_page,
                    }
                }
                None => {
                    debug!(key = %key, "stale page discarded");
                    ScrollOutcome::Ignored(IgnoreReason::Stale)
                }
            }
        }
    }
}

#[async_trait]
impl FetchQuiescer for InfiniteScrollController {
    async fn quiesce(&self, key: &FeedKey) -> bool {
        self.cancel(key).await
    }
}

impl std::fmt::Debug for InfiniteScrollController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let in_flight = self.in_flight.lock().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("InfiniteScrollController")
            .field("in_flight", &in_flight)
            .finish()
    }
}
