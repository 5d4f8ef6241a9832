use serde::{Deserialize, Serialize};

use crate::error::{SelectError, SelectResult};
use crate::rules::{AnyScopeRule, AuthorScopeRule, FeedRule};

/// Data form of a built-in [`FeedRule`].
///
/// In TOML:
///
/// ```toml
/// [[selector.rules]]
/// match = "any_scope"
/// kind = "home"
///
/// [[selector.rules]]
/// match = "author_scope"
/// kind = "profile"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum FeedRuleConfig {
    AnyScope { kind: String },
    AuthorScope { kind: String },
}

impl FeedRuleConfig {
    pub fn kind(&self) -> &str {
        match self {
            Self::AnyScope { kind } | Self::AuthorScope { kind } => kind,
        }
    }

    /// Build the rule this entry describes.
    pub fn build(&self) -> Box<dyn FeedRule> {
        match self {
            Self::AnyScope { kind } => Box::new(AnyScopeRule::new(kind.clone())),
            Self::AuthorScope { kind } => Box::new(AuthorScopeRule::new(kind.clone())),
        }
    }
}

/// Configuration for the feed query selector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub rules: Vec<FeedRuleConfig>,
}

impl Default for SelectorConfig {
    /// `home` for every post, `profile:<author>` for the author's own feed.
    fn default() -> Self {
        Self {
            rules: vec![
                FeedRuleConfig::AnyScope {
                    kind: "home".into(),
                },
                FeedRuleConfig::AuthorScope {
                    kind: "profile".into(),
                },
            ],
        }
    }
}

impl SelectorConfig {
    /// Check that every rule names a non-empty feed kind.
    pub fn validate(&self) -> SelectResult<()> {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.kind().trim().is_empty() {
                return Err(SelectError::Config(format!(
                    "rule at index {i} has an empty feed kind"
                )));
            }
        }
        Ok(())
    }
}
