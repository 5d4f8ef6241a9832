use nest_types::FeedKey;

/// A single case of feed selection.
///
/// The trait is object-safe and `Send + Sync` so rules can be stored in a
/// `Vec<Box<dyn FeedRule>>`. Implementations must be pure: the same key and
/// author always give the same answer.
pub trait FeedRule: Send + Sync {
    /// Human-readable name (e.g. "home", "profile").
    fn name(&self) -> &str;

    /// Whether a post by `author_id` belongs in the feed `key`.
    fn matches(&self, key: &FeedKey, author_id: &str) -> bool;
}

/// Matches every feed of `kind`, whatever its scope.
///
/// Used for the home feed: every new post shows up there.
#[derive(Clone, Debug)]
pub struct AnyScopeRule {
    kind: String,
}

impl AnyScopeRule {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

impl FeedRule for AnyScopeRule {
    fn name(&self) -> &str {
        &self.kind
    }

    fn matches(&self, key: &FeedKey, _author_id: &str) -> bool {
        key.kind() == self.kind
    }
}

/// Matches feeds of `kind` whose scope is the post's author.
///
/// Used for profile feeds: a post by `u1` belongs in `profile:u1` only.
#[derive(Clone, Debug)]
pub struct AuthorScopeRule {
    kind: String,
}

impl AuthorScopeRule {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

impl FeedRule for AuthorScopeRule {
    fn name(&self) -> &str {
        &self.kind
    }

    fn matches(&self, key: &FeedKey, author_id: &str) -> bool {
        key.kind() == self.kind && key.scope() == Some(author_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_scope_ignores_scope() {
        let rule = AnyScopeRule::new("home");
        assert!(rule.matches(&FeedKey::home(), "u1"));
        assert!(rule.matches(&FeedKey::scoped("home", "anything"), "u1"));
        assert!(!rule.matches(&FeedKey::profile("u1"), "u1"));
    }

    #[test]
    fn author_scope_requires_author() {
        let rule = AuthorScopeRule::new("profile");
        assert!(rule.matches(&FeedKey::profile("u1"), "u1"));
        assert!(!rule.matches(&FeedKey::profile("u2"), "u1"));
        assert!(!rule.matches(&FeedKey::new("profile"), "u1"));
        assert!(!rule.matches(&FeedKey::home(), "u1"));
    }
}
