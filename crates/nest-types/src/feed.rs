use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Structured identifier for one paginated feed view.
///
/// A key is a feed `kind` (e.g. `"home"`, `"profile"`) plus an optional
/// `scope` that narrows it (e.g. the user id whose profile is shown).
/// Equality and hashing are structural, so two independently built keys for
/// the same feed always address the same cached view.
///
/// The textual form is `kind` or `kind:scope`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeedKey {
    kind: String,
    scope: Option<String>,
}

impl FeedKey {
    /// Create a key with no scope.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            scope: None,
        }
    }

    /// Create a key narrowed to `scope`.
    pub fn scoped(kind: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            scope: Some(scope.into()),
        }
    }

    /// The home feed.
    pub fn home() -> Self {
        Self::new("home")
    }

    /// The profile feed of `user_id`.
    pub fn profile(user_id: impl Into<String>) -> Self {
        Self::scoped("profile", user_id)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

impl fmt::Debug for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedKey({self})")
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}:{}", self.kind, scope),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl FromStr for FeedKey {
    type Err = TypeError;

    /// Parse `kind` or `kind:scope`. Only the first `:` separates the two
    /// parts, so scopes may themselves contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, scope) = match s.split_once(':') {
            Some((kind, scope)) => (kind, Some(scope)),
            None => (s, None),
        };
        if kind.trim().is_empty() {
            return Err(TypeError::InvalidFeedKey(format!("empty kind in {s:?}")));
        }
        match scope {
            Some(scope) if scope.trim().is_empty() => Err(TypeError::InvalidFeedKey(format!(
                "empty scope in {s:?}"
            ))),
            Some(scope) => Ok(Self::scoped(kind, scope)),
            None => Ok(Self::new(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_is_structural() {
        assert_eq!(FeedKey::profile("u1"), FeedKey::scoped("profile", "u1"));
        assert_ne!(FeedKey::profile("u1"), FeedKey::profile("u2"));
        assert_ne!(FeedKey::home(), FeedKey::scoped("home", "x"));

        let mut set = HashSet::new();
        set.insert(FeedKey::profile("u1"));
        assert!(set.contains(&FeedKey::scoped("profile", String::from("u1"))));
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(FeedKey::home().to_string(), "home");
        assert_eq!(FeedKey::profile("u1").to_string(), "profile:u1");

        let parsed: FeedKey = "profile:u1".parse().unwrap();
        assert_eq!(parsed, FeedKey::profile("u1"));
        let parsed: FeedKey = "home".parse().unwrap();
        assert_eq!(parsed, FeedKey::home());
    }

    #[test]
    fn parse_keeps_colons_in_scope() {
        let parsed: FeedKey = "search:tag:rust".parse().unwrap();
        assert_eq!(parsed.kind(), "search");
        assert_eq!(parsed.scope(), Some("tag:rust"));
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert!(matches!(
            "".parse::<FeedKey>(),
            Err(TypeError::InvalidFeedKey(_))
        ));
        assert!(":u1".parse::<FeedKey>().is_err());
        assert!("profile:".parse::<FeedKey>().is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let key = FeedKey::profile("u1");
        let json = serde_json::to_string(&key).unwrap();
        let back: FeedKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
