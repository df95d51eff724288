//! Source types for feedcast.

use chrono::{DateTime, Utc};

/// A registered feed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Source ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Feed endpoint URL.
    pub feed_url: String,
    /// When the source was registered.
    pub created_at: DateTime<Utc>,
}

/// New source for registration.
#[derive(Debug, Clone)]
pub struct NewSource {
    /// Display name.
    pub name: String,
    /// Feed endpoint URL.
    pub feed_url: String,
}

impl NewSource {
    /// Create a new source.
    pub fn new(name: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feed_url: feed_url.into(),
        }
    }
}
