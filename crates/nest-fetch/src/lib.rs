//! Cursor-based page fetching and infinite scroll for the SocialNest client.
//!
//! [`PageFetcher`] is the transport seam for reading one page of a feed.
//! [`InfiniteScrollController`] drives page growth from viewport signals,
//! appends fetched pages to the feed store, and tracks the single in-flight
//! fetch per feed so the mutation coordinator can quiesce it through
//! [`FetchQuiescer`].

pub mod error;
pub mod fetcher;
pub mod quiesce;
pub mod scroll;

pub use error::{FetchError, FetchResult};
pub use fetcher::{FeedRequest, PageFetcher};
pub use quiesce::{FetchQuiescer, NoFetches};
pub use scroll::{FetchKind, IgnoreReason, InfiniteScrollController, ScrollOutcome};
