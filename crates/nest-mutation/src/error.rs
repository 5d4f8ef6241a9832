use thiserror::Error;

use crate::context::MutationState;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum MutationError {
    /// The create-post call failed. Every affected feed has been rolled back.
    #[error("create-post failed: {0}")]
    Transport(#[from] TransportError),

    #[error("post has no content and no media")]
    EmptyPost,

    #[error("too many attachments: {count} (max {max})")]
    TooManyAttachments { count: usize, max: usize },

    #[error("media attached twice: {0}")]
    DuplicateMedia(String),

    #[error("content too long: {len} characters (max {max})")]
    ContentTooLong { len: usize, max: usize },

    #[error("mutation is {actual:?}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: MutationState,
    },

    #[error("store error: {0}")]
    Store(#[from] nest_store::StoreError),
}

impl MutationError {
    /// `true` for errors raised before any feed was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyPost
                | Self::TooManyAttachments { .. }
                | Self::DuplicateMedia(_)
                | Self::ContentTooLong { .. }
        )
    }
}

pub type MutationResult<T> = Result<T, MutationError>;
