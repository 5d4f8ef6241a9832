//! Keyed cache of paginated feed views for the SocialNest client.
//!
//! Every read and write of cached feed state goes through a
//! [`FeedCacheStore`]. The store holds at most one [`CachedFeedView`] per
//! [`FeedKey`] and never interprets the views it holds.
//!
//! # Storage Backends
//!
//! - [`InMemoryFeedStore`] -- per-key slots behind a map, for the client
//!   process and for tests
//!
//! # Design Rules
//!
//! 1. `update` is atomic per key and applied in call order.
//! 2. Updates on different keys never wait on each other.
//! 3. An update returning `None` removes the view; absent views are only
//!    created by an update that returns `Some`.
//! 4. Lock poisoning is reported as an error, never a panic.
//!
//! [`CachedFeedView`]: nest_types::CachedFeedView
//! [`FeedKey`]: nest_types::FeedKey

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryFeedStore;
pub use traits::{FeedCacheStore, FeedCacheStoreExt};
