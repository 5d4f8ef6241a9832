use std::path::Path;

use nest_mutation::MutationConfig;
use nest_select::SelectorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Configuration for a [`FeedClient`](crate::FeedClient).
///
/// ```toml
/// [mutation]
/// overlap = "serialized"
/// max_attachments = 5
///
/// [[selector.rules]]
/// match = "any_scope"
/// kind = "home"
/// ```
///
/// Missing sections fall back to their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub selector: SelectorConfig,
    pub mutation: MutationConfig,
}

impl ClientConfig {
    pub fn from_toml_str(text: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), rules = config.selector.rules.len(), "config loaded");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ClientResult<String> {
        toml::to_string_pretty(self).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ClientResult<()> {
        self.selector.validate()?;
        if self.mutation.max_content_chars == Some(0) {
            return Err(ClientError::Config(
                "mutation.max_content_chars must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
