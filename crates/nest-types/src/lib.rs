//! Foundation types for the SocialNest feed client.
//!
//! This crate provides the data model shared by every other `nest-*` crate:
//! the structured feed key, post records, pages, and the cached paginated
//! view that the feed store holds per key.
//!
//! # Key Types
//!
//! - [`FeedKey`] -- Structured `{kind, scope?}` identifier for one feed view
//! - [`PostId`] -- Either a locally synthesized [`TempId`] or a canonical server id
//! - [`PostRecord`] -- A post with its author and ordered media references
//! - [`Page`] -- One fetched page of posts plus the cursor to the next page
//! - [`CachedFeedView`] -- All fetched pages of a feed, in fetch order

pub mod error;
pub mod feed;
pub mod page;
pub mod post;

pub use error::TypeError;
pub use feed::FeedKey;
pub use page::{CachedFeedView, Cursor, Page};
pub use post::{Author, MediaRef, PostId, PostRecord, TempId};
