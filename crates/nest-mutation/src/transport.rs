use async_trait::async_trait;
use nest_types::PostRecord;
use serde::{Deserialize, Serialize};

/// Wire form of a create-post call: `{content, mediaIds}`.
///
/// Media ids are already resolved by the upload subsystem; order is kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
    pub media_ids: Vec<String>,
}

/// Failure reported by the create-post transport. Carries no taxonomy
/// beyond a message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Transport interface for creating posts on the server.
///
/// Retries and timeouts, if any, belong to the implementation; the
/// coordinator reports failure exactly when this returns `Err`.
#[async_trait]
pub trait PostTransport: Send + Sync {
    async fn create_post(&self, request: &CreatePostRequest) -> Result<PostRecord, TransportError>;
}
