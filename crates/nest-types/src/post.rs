use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Locally synthesized identifier tagging an optimistic placeholder post.
///
/// Temp ids are UUID v7 values, so they are unique per process and
/// time-ordered. They live in a separate variant of [`PostId`] and therefore
/// can never be confused with a server-assigned id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TempId(uuid::Uuid);

impl TempId {
    /// Generate a fresh temp id.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TempId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TempId({})", self.short_id())
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tmp-{}", self.0)
    }
}

impl FromStr for TempId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("tmp-").unwrap_or(s);
        uuid::Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| TypeError::InvalidTempId(e.to_string()))
    }
}

/// Identity of a post: a local placeholder id or the server's canonical id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostId {
    Temp(TempId),
    Canonical(String),
}

impl PostId {
    pub fn canonical(id: impl Into<String>) -> Self {
        Self::Canonical(id.into())
    }

    pub fn is_temp(&self) -> bool {
        matches!(self, Self::Temp(_))
    }

    pub fn as_temp(&self) -> Option<&TempId> {
        match self {
            Self::Temp(t) => Some(t),
            Self::Canonical(_) => None,
        }
    }
}

impl From<TempId> for PostId {
    fn from(t: TempId) -> Self {
        Self::Temp(t)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temp(t) => write!(f, "{t}"),
            Self::Canonical(id) => write!(f, "{id}"),
        }
    }
}

/// Public profile of a post's author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl Author {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

/// Reference to an uploaded media item attached to a post.
///
/// `url` is `None` until the server has resolved the media item, which is
/// always the case for placeholder posts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub media_id: String,
    pub url: Option<String>,
}

impl MediaRef {
    pub fn unresolved(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            url: None,
        }
    }
}

/// A post as shown in a feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: Author,
    pub media: Vec<MediaRef>,
}

impl PostRecord {
    /// Build the optimistic stand-in for a post that has not been confirmed
    /// by the server yet. Media references carry no URL.
    pub fn placeholder(
        temp_id: TempId,
        author: Author,
        content: impl Into<String>,
        media_ids: &[String],
    ) -> Self {
        Self {
            id: PostId::Temp(temp_id),
            content: content.into(),
            created_at: Utc::now(),
            author,
            media: media_ids.iter().map(MediaRef::unresolved).collect(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_temp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_are_unique() {
        let a = TempId::new();
        let b = TempId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn temp_id_display_and_parse() {
        let t = TempId::new();
        let s = t.to_string();
        assert!(s.starts_with("tmp-"));
        assert_eq!(s.parse::<TempId>().unwrap(), t);
        assert!("tmp-not-a-uuid".parse::<TempId>().is_err());
    }

    #[test]
    fn temp_never_equals_canonical() {
        let t = TempId::new();
        let as_canonical = PostId::canonical(t.to_string());
        assert_ne!(PostId::Temp(t), as_canonical);
    }

    #[test]
    fn placeholder_shape() {
        let t = TempId::new();
        let author = Author::new("u1", "alice", "Alice").with_avatar("https://a/1.png");
        let media = vec!["m1".to_string(), "m2".to_string()];
        let post = PostRecord::placeholder(t, author.clone(), "hello", &media);

        assert!(post.is_placeholder());
        assert_eq!(post.id.as_temp(), Some(&t));
        assert_eq!(post.author, author);
        assert_eq!(post.media.len(), 2);
        assert_eq!(post.media[0].media_id, "m1");
        assert!(post.media.iter().all(|m| m.url.is_none()));
    }

    #[test]
    fn canonical_id_helpers() {
        let id = PostId::canonical("p1");
        assert!(!id.is_temp());
        assert!(id.as_temp().is_none());
        assert_eq!(id.to_string(), "p1");
    }
}
