use async_trait::async_trait;
use nest_types::{Cursor, FeedKey, Page};
use serde::{Deserialize, Serialize};

use crate::error::FetchResult;

/// Wire form of a feed page request: `{feedKind, scope?, cursor?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRequest {
    pub feed_kind: String,
    pub scope: Option<String>,
    pub cursor: Option<Cursor>,
}

impl FeedRequest {
    pub fn new(key: &FeedKey, cursor: Option<&Cursor>) -> Self {
        Self {
            feed_kind: key.kind().to_string(),
            scope: key.scope().map(str::to_string),
            cursor: cursor.cloned(),
        }
    }
}

/// Transport interface for reading feed pages.
///
/// `cursor == None` requests the first (newest) page. Implementations must
/// not touch the feed store; failures are returned to the caller.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, key: &FeedKey, cursor: Option<&Cursor>) -> FetchResult<Page>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_from_scoped_key() {
        let cursor = Cursor::new("abc");
        let req = FeedRequest::new(&FeedKey::profile("u1"), Some(&cursor));
        assert_eq!(req.feed_kind, "profile");
        assert_eq!(req.scope.as_deref(), Some("u1"));
        assert_eq!(req.cursor, Some(cursor));
    }

    #[test]
    fn request_for_first_page() {
        let req = FeedRequest::new(&FeedKey::home(), None);
        assert_eq!(req.feed_kind, "home");
        assert!(req.scope.is_none());
        assert!(req.cursor.is_none());
    }
}
