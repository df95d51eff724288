//! Article store for feedcast.
//!
//! Articles are created unposted by the fetch loop and transition exactly
//! once to posted when the notification loop has published them. Rows are
//! never deleted.

mod repository;
mod types;

pub use repository::ArticleRepository;
pub use types::{Article, Item, NewArticle, MAX_SUMMARY_LENGTH};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::Result;

/// Durable article storage shared by the fetch and notification loops.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert an article. Returns `None` if `(source_id, link)` already exists.
    async fn store(&self, article: &NewArticle) -> Result<Option<i64>>;

    /// Up to `limit` unposted articles with `published_at >= threshold`,
    /// oldest first.
    async fn unposted_since(&self, threshold: DateTime<Utc>, limit: u32)
        -> Result<Vec<Article>>;

    /// Set `posted_at` to now. Returns `false` if it was already set.
    async fn mark_posted(&self, article_id: i64) -> Result<bool>;
}

#[async_trait]
impl ArticleStore for Database {
    async fn store(&self, article: &NewArticle) -> Result<Option<i64>> {
        ArticleRepository::new(self.pool()).store(article).await
    }

    async fn unposted_since(
        &self,
        threshold: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Article>> {
        ArticleRepository::new(self.pool())
            .unposted_since(threshold, limit)
            .await
    }

    async fn mark_posted(&self, article_id: i64) -> Result<bool> {
        ArticleRepository::new(self.pool())
            .mark_posted(article_id)
            .await
    }
}
