use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use nest_types::{CachedFeedView, FeedKey};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{FeedCacheStore, ViewUpdate};

type Slot = Arc<Mutex<Option<CachedFeedView>>>;

/// In-memory feed store with one lock per key.
///
/// The outer `RwLock` only guards the key -> slot map and is held for the
/// lookup alone; the update closure runs under the slot's own `Mutex`, so
/// writers to different keys proceed independently.
///
/// A slot is dropped from the map as soon as its view becomes absent, so
/// keys that never hold a view cost nothing. Lock order is always slot then
/// map; a writer that locks a slot which was dropped in the meantime retries
/// against the live one.
pub struct InMemoryFeedStore {
    slots: RwLock<HashMap<FeedKey, Slot>>,
}

impl InMemoryFeedStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently holding a view.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.keys()?.len())
    }

    /// Returns `true` if no key holds a view.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop every cached view.
    pub fn clear(&self) -> StoreResult<()> {
        for (key, slot) in self.all_slots()? {
            let mut guard = lock_slot(&slot)?;
            *guard = None;
            self.reclaim(&key, &slot)?;
        }
        Ok(())
    }

    fn slot(&self, key: &FeedKey) -> StoreResult<Option<Slot>> {
        let slots = self
            .slots
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn slot_or_insert(&self, key: &FeedKey) -> StoreResult<Slot> {
        if let Some(slot) = self.slot(key)? {
            return Ok(slot);
        }
        let mut slots = self
            .slots
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        Ok(Arc::clone(slots.entry(key.clone()).or_default()))
    }

    /// Whether `slot` is still the map's entry for `key`.
    fn is_live(&self, key: &FeedKey, slot: &Slot) -> StoreResult<bool> {
        Ok(self
            .slot(key)?
            .is_some_and(|current| Arc::ptr_eq(&current, slot)))
    }

    /// Drop `key`'s entry if it is still `slot`. Call with the slot locked
    /// and empty.
    fn reclaim(&self, key: &FeedKey, slot: &Slot) -> StoreResult<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
        Ok(())
    }

    fn all_slots(&self) -> StoreResult<Vec<(FeedKey, Slot)>> {
        let slots = self
            .slots
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        Ok(slots
            .iter()
            .map(|(k, s)| (k.clone(), Arc::clone(s)))
            .collect())
    }
}

fn lock_slot(slot: &Slot) -> StoreResult<std::sync::MutexGuard<'_, Option<CachedFeedView>>> {
    slot.lock()
        .map_err(|e| StoreError::LockPoisoned(e.to_string()))
}

impl Default for InMemoryFeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedCacheStore for InMemoryFeedStore {
    fn get(&self, key: &FeedKey) -> StoreResult<Option<CachedFeedView>> {
        let Some(slot) = self.slot(key)? else {
            return Ok(None);
        };
        let view = lock_slot(&slot)?.clone();
        Ok(view)
    }

    fn update(&self, key: &FeedKey, f: &mut ViewUpdate<'_>) -> StoreResult<Option<CachedFeedView>> {
        loop {
            let slot = self.slot_or_insert(key)?;
            let mut guard = lock_slot(&slot)?;
            if !self.is_live(key, &slot)? {
                continue;
            }
            let had_view = guard.is_some();
            *guard = f(guard.take());
            let view = guard.clone();
            if view.is_none() {
                self.reclaim(key, &slot)?;
            }
            debug!(
                key = %key,
                had_view,
                has_view = view.is_some(),
                "feed view updated"
            );
            return Ok(view);
        }
    }

    fn query(
        &self,
        predicate: &dyn Fn(&FeedKey) -> bool,
    ) -> StoreResult<Vec<(FeedKey, CachedFeedView)>> {
        let mut out = Vec::new();
        for (key, slot) in self.all_slots()? {
            if !predicate(&key) {
                continue;
            }
            let view = lock_slot(&slot)?.clone();
            if let Some(view) = view {
                out.push((key, view));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

impl std::fmt::Debug for InMemoryFeedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or_default();
        f.debug_struct("InMemoryFeedStore")
            .field("view_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FeedCacheStoreExt;
    use chrono::{TimeZone, Utc};
    use nest_types::{Author, Cursor, Page, PostId, PostRecord};

    fn post(id: &str) -> PostRecord {
        PostRecord {
            id: PostId::canonical(id),
            content: id.to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            author: Author::new("u1", "alice", "Alice"),
            media: Vec::new(),
        }
    }

    fn view(ids: &[&str]) -> CachedFeedView {
        CachedFeedView::from_first_page(Page::new(
            ids.iter().map(|id| post(id)).collect(),
            Some(Cursor::new("c1")),
        ))
    }

    // -----------------------------------------------------------------------
    // get / update
    // -----------------------------------------------------------------------

    #[test]
    fn get_missing_returns_none() {
        let store = InMemoryFeedStore::new();
        assert!(store.get(&FeedKey::home()).unwrap().is_none());
    }

    #[test]
    fn put_then_get() {
        let store = InMemoryFeedStore::new();
        store.put(&FeedKey::home(), view(&["p1"])).unwrap();
        let read_back = store.get(&FeedKey::home()).unwrap().expect("should exist");
        assert_eq!(read_back, view(&["p1"]));
    }

    #[test]
    fn update_sees_current_view() {
        let store = InMemoryFeedStore::new();
        let key = FeedKey::home();
        store.put(&key, view(&["p1"])).unwrap();

        let mut seen = None;
        store
            .update(&key, &mut |v| {
                seen = v.clone();
                v
            })
            .unwrap();
        assert_eq!(seen, Some(view(&["p1"])));
    }

    #[test]
    fn update_returning_none_removes() {
        let store = InMemoryFeedStore::new();
        let key = FeedKey::home();
        store.put(&key, view(&["p1"])).unwrap();
        let after = store.update_with(&key, |_| None).unwrap();
        assert!(after.is_none());
        assert!(store.get(&key).unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn modify_never_creates_absent_view() {
        let store = InMemoryFeedStore::new();
        let key = FeedKey::profile("u1");
        let result = store.modify(&key, |v| v.post_count()).unwrap();
        assert!(result.is_none());
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn modify_existing_view() {
        let store = InMemoryFeedStore::new();
        let key = FeedKey::home();
        store.put(&key, view(&["p1", "p2"])).unwrap();
        let removed = store
            .modify(&key, |v| v.remove_post(&PostId::canonical("p1")).is_some())
            .unwrap();
        assert_eq!(removed, Some(true));
        assert_eq!(store.get(&key).unwrap().unwrap().post_count(), 1);
    }

    #[test]
    fn remove_returns_previous() {
        let store = InMemoryFeedStore::new();
        let key = FeedKey::home();
        store.put(&key, view(&["p1"])).unwrap();
        assert_eq!(store.remove(&key).unwrap(), Some(view(&["p1"])));
        assert!(store.remove(&key).unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // query / keys
    // -----------------------------------------------------------------------

    #[test]
    fn query_filters_and_orders() {
        let store = InMemoryFeedStore::new();
        store.put(&FeedKey::profile("v"), view(&["p3"])).unwrap();
        store.put(&FeedKey::home(), view(&["p1"])).unwrap();
        store.put(&FeedKey::profile("u"), view(&["p2"])).unwrap();

        let profiles = store.query(&|k| k.kind() == "profile").unwrap();
        let keys: Vec<FeedKey> = profiles.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![FeedKey::profile("u"), FeedKey::profile("v")]);

        assert_eq!(store.keys().unwrap().len(), 3);
    }

    #[test]
    fn query_skips_emptied_slots() {
        let store = InMemoryFeedStore::new();
        store.put(&FeedKey::home(), view(&["p1"])).unwrap();
        store.remove(&FeedKey::home()).unwrap();
        assert!(store.query(&|_| true).unwrap().is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let store = InMemoryFeedStore::new();
        store.put(&FeedKey::home(), view(&["p1"])).unwrap();
        store.put(&FeedKey::profile("u"), view(&["p2"])).unwrap();
        store.clear().unwrap();
        assert_eq!(store.len().unwrap(), 0);
        assert!(store.get(&FeedKey::home()).unwrap().is_none());
        assert_eq!(store.slots.read().unwrap().len(), 0);

        store.put(&FeedKey::home(), view(&["p3"])).unwrap();
        assert_eq!(store.get(&FeedKey::home()).unwrap(), Some(view(&["p3"])));
    }

    #[test]
    fn absent_keys_hold_no_slot() {
        let store = InMemoryFeedStore::new();
        let key = FeedKey::profile("u1");
        assert!(store.remove(&key).unwrap().is_none());
        assert!(store.modify(&key, |v| v.post_count()).unwrap().is_none());
        assert!(store.get(&key).unwrap().is_none());
        assert_eq!(store.slots.read().unwrap().len(), 0);

        store.put(&key, view(&["p1"])).unwrap();
        assert_eq!(store.slots.read().unwrap().len(), 1);
        store.remove(&key).unwrap();
        assert_eq!(store.slots.read().unwrap().len(), 0);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_updates_on_one_key_are_not_lost() {
        use std::thread;

        let store = Arc::new(InMemoryFeedStore::new());
        let key = FeedKey::home();
        store.put(&key, view(&[])).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let key = key.clone();
                thread::spawn(move || {
                    for j in 0..25 {
                        store
                            .modify(&key, |v| v.prepend_to_first_page(post(&format!("t{i}-{j}"))))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        assert_eq!(store.get(&key).unwrap().unwrap().post_count(), 200);
    }

    #[test]
    fn concurrent_put_and_remove_keep_last_write() {
        use std::thread;

        let store = Arc::new(InMemoryFeedStore::new());
        let key = FeedKey::home();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let key = key.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        if i % 2 == 0 {
                            store.put(&key, view(&["p1"])).unwrap();
                        } else {
                            store.remove(&key).unwrap();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        // Whatever won, the map and the view agree.
        let has_view = store.get(&key).unwrap().is_some();
        assert_eq!(store.slots.read().unwrap().len(), usize::from(has_view));
        store.put(&key, view(&["p2"])).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(view(&["p2"])));
    }

    #[test]
    fn update_on_one_key_does_not_hold_another() {
        let store = InMemoryFeedStore::new();
        store.put(&FeedKey::home(), view(&["p1"])).unwrap();
        store.put(&FeedKey::profile("u"), view(&["p2"])).unwrap();

        // A nested update on a different key from inside an update closure
        // would deadlock if keys shared a lock.
        store
            .update_with(&FeedKey::home(), |v| {
                let other = store.get(&FeedKey::profile("u")).unwrap();
                assert!(other.is_some());
                v
            })
            .unwrap();
    }

    #[test]
    fn debug_format() {
        let store = InMemoryFeedStore::new();
        store.put(&FeedKey::home(), view(&["p1"])).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryFeedStore"));
        assert!(debug.contains("view_count"));
    }
}
