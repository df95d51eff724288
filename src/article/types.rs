//! Article types for feedcast.

use chrono::{DateTime, Utc};

/// Maximum length for a stored article summary, in characters.
pub const MAX_SUMMARY_LENGTH: usize = 10000;

/// One raw entry obtained from a source during a single poll.
///
/// Items are never persisted directly; the fetch loop either converts them
/// into a [`NewArticle`] or drops them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    /// Item title.
    pub title: String,
    /// Link to the original article. Together with the source, the dedup key.
    pub link: String,
    /// Free-text summary (HTML stripped).
    pub summary: String,
    /// Category tags declared by the feed.
    pub categories: Vec<String>,
    /// Publication time, if the feed declared one.
    pub published_at: Option<DateTime<Utc>>,
    /// Name of the source that produced the item.
    pub source_name: String,
}

impl Item {
    /// Create an item with a title and link.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            ..Self::default()
        }
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Add a category tag.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Set the publication time.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Set the originating source name.
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }
}

/// New article for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    /// Owning source ID.
    pub source_id: i64,
    /// Article title.
    pub title: String,
    /// Link to the original article.
    pub link: String,
    /// Article summary.
    pub summary: String,
    /// Publication time (UTC).
    pub published_at: DateTime<Utc>,
}

impl NewArticle {
    /// Create a new article.
    pub fn new(
        source_id: i64,
        title: impl Into<String>,
        link: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id,
            title: title.into(),
            link: link.into(),
            summary: String::new(),
            published_at,
        }
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Convert a fetched item into an article owned by `source_id`.
    ///
    /// Items without a publication time are stamped with `fetched_at`.
    pub fn from_item(source_id: i64, item: Item, fetched_at: DateTime<Utc>) -> Self {
        let summary = if item.summary.chars().count() > MAX_SUMMARY_LENGTH {
            item.summary.chars().take(MAX_SUMMARY_LENGTH).collect()
        } else {
            item.summary
        };

        Self {
            source_id,
            title: item.title,
            link: item.link,
            summary,
            published_at: item.published_at.unwrap_or(fetched_at),
        }
    }
}

/// A persisted article.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Article ID.
    pub id: i64,
    /// Owning source ID.
    pub source_id: i64,
    /// Article title.
    pub title: String,
    /// Link to the original article.
    pub link: String,
    /// Article summary.
    pub summary: String,
    /// Publication time (UTC).
    pub published_at: DateTime<Utc>,
    /// When the article was published to the channel, if it has been.
    pub posted_at: Option<DateTime<Utc>>,
    /// When the article was stored.
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Whether the article has been published to the channel.
    pub fn is_posted(&self) -> bool {
        self.posted_at.is_some()
    }
}
