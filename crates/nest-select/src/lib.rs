//! Feed query selection for the SocialNest client.
//!
//! Given the author of a new post, the [`FeedQuerySelector`] decides which
//! cached feeds the post belongs in. The selector is a list of
//! [`FeedRule`]s evaluated in order; a key is affected if any rule matches.
//!
//! # Built-in rules
//!
//! - [`AnyScopeRule`] -- every feed of a kind, whatever its scope (`home`)
//! - [`AuthorScopeRule`] -- feeds of a kind scoped to the author (`profile:<author>`)
//!
//! New feed kinds are added by configuring another rule (see
//! [`SelectorConfig`]) or by implementing [`FeedRule`]; the mutation
//! coordinator never needs to change.

pub mod config;
pub mod error;
pub mod rules;
pub mod selector;

pub use config::{FeedRuleConfig, SelectorConfig};
pub use error::{SelectError, SelectResult};
pub use rules::{AnyScopeRule, AuthorScopeRule, FeedRule};
pub use selector::{AuthorPredicate, FeedQuerySelector};
