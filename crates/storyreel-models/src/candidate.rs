//! Search candidates discovered by the candidate source.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// External identifier of a candidate (the provider's video ID).
///
/// A selected candidate keeps this ID as its content item ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the ID is usable for a provider lookup.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A video discovered by search, not yet confirmed for deep analysis.
///
/// Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Candidate {
    /// External video ID
    pub id: ItemId,

    /// Video title (entity-decoded)
    pub title: String,

    /// Description snippet (entity-decoded)
    pub description: String,

    /// Thumbnail URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Publish timestamp
    pub published_at: DateTime<Utc>,
}

impl Candidate {
    /// Create a new candidate.
    pub fn new(
        id: impl Into<ItemId>,
        title: impl Into<String>,
        description: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            thumbnail_url: None,
            published_at,
        }
    }

    /// Set the thumbnail URL.
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// Publish date as `YYYY-MM-DD`.
    pub fn published_date(&self) -> String {
        self.published_at.format("%Y-%m-%d").to_string()
    }
}

/// Sort candidates most recent first.
///
/// The sort is stable, so candidates published at the same instant keep
/// provider order.
pub fn sort_by_recency(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}
