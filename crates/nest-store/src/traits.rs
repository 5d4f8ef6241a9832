use nest_types::{CachedFeedView, FeedKey};

use crate::error::StoreResult;

/// Closure applied by [`FeedCacheStore::update`]: receives the current view
/// (or `None` when absent) and returns the replacement (or `None` to leave
/// the key absent).
pub type ViewUpdate<'a> = dyn FnMut(Option<CachedFeedView>) -> Option<CachedFeedView> + 'a;

/// Keyed store of cached feed views.
///
/// All implementations must satisfy these invariants:
/// - `update` on one key is atomic with respect to other updates on the
///   same key, and updates on one key apply in call order.
/// - Updates on different keys do not block each other.
/// - The update closure is called exactly once per `update` call.
/// - Reads return owned copies; a caller can never observe a half-applied
///   update.
pub trait FeedCacheStore: Send + Sync {
    /// Read the view cached under `key`.
    fn get(&self, key: &FeedKey) -> StoreResult<Option<CachedFeedView>>;

    /// Atomically replace the view under `key` with the result of `f`.
    ///
    /// Returns the view now stored under `key`.
    fn update(&self, key: &FeedKey, f: &mut ViewUpdate<'_>) -> StoreResult<Option<CachedFeedView>>;

    /// All present `(key, view)` pairs whose key satisfies `predicate`,
    /// ordered by key.
    fn query(
        &self,
        predicate: &dyn Fn(&FeedKey) -> bool,
    ) -> StoreResult<Vec<(FeedKey, CachedFeedView)>>;

    /// Keys that currently hold a view, ordered.
    fn keys(&self) -> StoreResult<Vec<FeedKey>> {
        Ok(self.query(&|_| true)?.into_iter().map(|(k, _)| k).collect())
    }

    /// Drop the view under `key`. Returns the removed view.
    fn remove(&self, key: &FeedKey) -> StoreResult<Option<CachedFeedView>> {
        let mut removed = None;
        self.update(key, &mut |view| {
            removed = view;
            None
        })?;
        Ok(removed)
    }
}

/// Convenience helpers layered over [`FeedCacheStore::update`].
pub trait FeedCacheStoreExt: FeedCacheStore {
    /// Like [`FeedCacheStore::update`] but accepts a `FnOnce`.
    fn update_with<F>(&self, key: &FeedKey, f: F) -> StoreResult<Option<CachedFeedView>>
    where
        F: FnOnce(Option<CachedFeedView>) -> Option<CachedFeedView>,
    {
        let mut f = Some(f);
        self.update(key, &mut |view| match f.take() {
            Some(f) => f(view),
            None => view,
        })
    }

    /// Mutate the view under `key` in place if it exists.
    ///
    /// Returns `None` without calling `f` when the key holds no view; an
    /// absent view is never created by this method.
    fn modify<F, R>(&self, key: &FeedKey, f: F) -> StoreResult<Option<R>>
    where
        F: FnOnce(&mut CachedFeedView) -> R,
    {
        let mut out = None;
        self.update_with(key, |view| {
            view.map(|mut view| {
                out = Some(f(&mut view));
                view
            })
        })?;
        Ok(out)
    }

    /// Store `view` under `key`, replacing whatever was there.
    fn put(&self, key: &FeedKey, view: CachedFeedView) -> StoreResult<()> {
        self.update_with(key, |_| Some(view))?;
        Ok(())
    }
}

impl<T: FeedCacheStore + ?Sized> FeedCacheStoreExt for T {}
