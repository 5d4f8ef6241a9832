//! High-level client for the SocialNest feed engine.
//!
//! [`FeedClient`] wires the feed cache, the infinite scroll controller, and
//! the optimistic mutation coordinator together behind one API.
//! [`ClientConfig`] is the TOML-loadable configuration for all of them, and
//! [`InMemoryFeedBackend`] is a server stand-in implementing both transport
//! seams for tests and the CLI simulator.

pub mod backend;
pub mod client;
pub mod config;
pub mod error;

pub use backend::InMemoryFeedBackend;
pub use client::FeedClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};

// Re-export the types callers need to drive a client
pub use nest_fetch::{IgnoreReason, ScrollOutcome};
pub use nest_mutation::{MutationOutcome, OverlapPolicy, Reconciliation, SubmitPost};
pub use nest_types::{Author, CachedFeedView, FeedKey, PostId, PostRecord};
