//! Engagement statistics snapshot.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder shown for a statistic that has not been resolved.
pub const UNKNOWN_STAT: &str = "-";

/// A single statistic: either resolved or still unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatValue {
    /// Not resolved yet (or the provider withheld it)
    #[default]
    Unknown,
    /// Resolved count
    Count(u64),
}

impl StatValue {
    /// Parse a provider value. Providers send counts as decimal strings.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<u64>().ok())
            .map(StatValue::Count)
            .unwrap_or(StatValue::Unknown)
    }

    /// Replace with `other` only if that upgrades the value.
    ///
    /// A resolved value never regresses to unknown.
    pub fn merge(&mut self, other: StatValue) {
        if let StatValue::Count(_) = other {
            *self = other;
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Unknown => f.write_str(UNKNOWN_STAT),
            StatValue::Count(n) => f.write_str(&group_thousands(*n)),
        }
    }
}

/// Format a count with comma thousands separators.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// View/like/comment snapshot for a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct VideoStats {
    pub views: StatValue,
    pub likes: StatValue,
    pub comments: StatValue,
}

impl VideoStats {
    /// All statistics unknown.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Build from provider strings.
    pub fn from_raw(views: Option<&str>, likes: Option<&str>, comments: Option<&str>) -> Self {
        Self {
            views: StatValue::parse(views),
            likes: StatValue::parse(likes),
            comments: StatValue::parse(comments),
        }
    }

    /// Merge resolved fields from `other`; unknown fields in `other` are ignored.
    pub fn merge_resolved(&mut self, other: &VideoStats) {
        self.views.merge(other.views);
        self.likes.merge(other.likes);
        self.comments.merge(other.comments);
    }
}
