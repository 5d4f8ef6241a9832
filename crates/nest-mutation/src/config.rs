use serde::{Deserialize, Serialize};

/// How overlapping submissions that affect the same feed interact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Every submission applies its placeholder immediately and snapshots
    /// the then-current view. Rolling back restores that snapshot only when
    /// nothing else changed the feed since; otherwise it removes just its
    /// own placeholder, so other attempts' placeholders and committed posts
    /// stay.
    #[default]
    Stacked,
    /// Submissions touching a common feed wait for each other, in arrival
    /// order; each one's snapshot contains no pending placeholder.
    Serialized,
}

/// Configuration for the mutation coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    pub overlap: OverlapPolicy,
    /// Maximum media attachments per post.
    pub max_attachments: usize,
    /// Optional upper bound on post length, in characters.
    pub max_content_chars: Option<usize>,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            overlap: OverlapPolicy::Stacked,
            max_attachments: 5,
            max_content_chars: None,
        }
    }
}
