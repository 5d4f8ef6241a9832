//! Optimistic post creation for the SocialNest client.
//!
//! The [`OptimisticMutationCoordinator`] makes a new post visible in every
//! affected cached feed before the server has confirmed it, then either
//! swaps the placeholder for the server's record or restores every feed to
//! exactly what it was.
//!
//! Each attempt runs through an explicit state machine:
//!
//! ```text
//! Idle -> Pending -> Committed  -> Idle
//!                 \-> RolledBack -> Idle
//! ```
//!
//! 1. **Select** affected feeds among the cached ones (`nest-select`).
//! 2. **Quiesce** in-flight page fetches on those feeds (`nest-fetch`).
//! 3. **Snapshot** each affected view into the [`MutationContext`].
//! 4. **Apply** a placeholder tagged with a fresh temp id.
//! 5. **Await** the [`PostTransport`] call; no store lock is held meanwhile.
//! 6. **Commit** by temp-id replacement, or
//! 7. **Rollback** by restoring each snapshot, or, where other attempts
//!    changed the feed since, by removing only this attempt's placeholder.
//!
//! Dropping a [`submit`](OptimisticMutationCoordinator::submit) future
//! mid-flight rolls its attempt back.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod transport;

pub use config::{MutationConfig, OverlapPolicy};
pub use context::{MutationContext, MutationSnapshot, MutationState};
pub use coordinator::{
    CommitReport, MutationOutcome, OptimisticMutationCoordinator, Reconciliation, SubmitPost,
};
pub use error::{MutationError, MutationResult};
pub use transport::{CreatePostRequest, PostTransport, TransportError};
