use nest_types::FeedKey;
use tracing::debug;

use crate::config::SelectorConfig;
use crate::error::SelectResult;
use crate::rules::{AnyScopeRule, AuthorScopeRule, FeedRule};

/// Maps the author of a new post to the feeds that post affects.
///
/// The selector is the single place that knows which feeds a post shows up
/// in. It is pure: evaluating it has no side effects and does not look at
/// the cache. Callers apply the returned predicate to the keys they hold.
pub struct FeedQuerySelector {
    rules: Vec<Box<dyn FeedRule>>,
}

impl FeedQuerySelector {
    /// An empty selector that matches nothing.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard selector: `home` and the author's `profile`.
    pub fn with_default_rules() -> Self {
        let mut selector = Self::new();
        selector.add_rule(Box::new(AnyScopeRule::new("home")));
        selector.add_rule(Box::new(AuthorScopeRule::new("profile")));
        selector
    }

    /// Build a selector from validated configuration.
    pub fn from_config(config: &SelectorConfig) -> SelectResult<Self> {
        config.validate()?;
        let mut selector = Self::new();
        for rule in &config.rules {
            selector.add_rule(rule.build());
        }
        Ok(selector)
    }

    /// Append a rule.
    pub fn add_rule(&mut self, rule: Box<dyn FeedRule>) {
        self.rules.push(rule);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Whether a post by `author_id` belongs in `key`.
    pub fn affects(&self, author_id: &str, key: &FeedKey) -> bool {
        let hit = self.rules.iter().find(|r| r.matches(key, author_id));
        if let Some(rule) = hit {
            debug!(key = %key, author = author_id, rule = rule.name(), "feed affected");
        }
        hit.is_some()
    }

    /// The predicate over feed keys for posts by `author_id`.
    pub fn for_author<'a>(&'a self, author_id: &'a str) -> AuthorPredicate<'a> {
        AuthorPredicate {
            selector: self,
            author_id,
        }
    }
}

impl Default for FeedQuerySelector {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl std::fmt::Debug for FeedQuerySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedQuerySelector")
            .field("rules", &self.rule_names())
            .finish()
    }
}

/// Predicate over feed keys bound to one author.
#[derive(Clone, Copy)]
pub struct AuthorPredicate<'a> {
    selector: &'a FeedQuerySelector,
    author_id: &'a str,
}

impl AuthorPredicate<'_> {
    pub fn matches(&self, key: &FeedKey) -> bool {
        self.selector.affects(self.author_id, key)
    }

    pub fn author_id(&self) -> &str {
        self.author_id
    }
}
