//! Article repository for feedcast.

use chrono::{DateTime, Utc};

use super::types::{Article, NewArticle};
use crate::db::{decode_timestamp, format_timestamp, DbPool};
use crate::{FeedcastError, Result};

/// Row type for an article from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    source_id: i64,
    title: String,
    link: String,
    summary: String,
    published_at: String,
    posted_at: Option<String>,
    created_at: String,
}

impl TryFrom<ArticleRow> for Article {
    type Error = FeedcastError;

    fn try_from(row: ArticleRow) -> Result<Self> {
        Ok(Article {
            id: row.id,
            source_id: row.source_id,
            title: row.title,
            link: row.link,
            summary: row.summary,
            published_at: decode_timestamp("articles.published_at", &row.published_at)?,
            posted_at: row
                .posted_at
                .map(|s| decode_timestamp("articles.posted_at", &s))
                .transpose()?,
            created_at: decode_timestamp("articles.created_at", &row.created_at)?,
        })
    }
}

/// Repository for the article store.
pub struct ArticleRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ArticleRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a new article, ignoring it if the same (source_id, link) exists.
    ///
    /// Returns the new article ID, or `None` when the article was a duplicate.
    pub async fn store(&self, article: &NewArticle) -> Result<Option<i64>> {
        let published_at = format_timestamp(&article.published_at);
        let created_at = format_timestamp(&Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO articles (source_id, title, link, summary, published_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_id, link) DO NOTHING
            "#,
        )
        .bind(article.source_id)
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.summary)
        .bind(&published_at)
        .bind(&created_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(Some(result.last_insert_rowid()))
        } else {
            Ok(None) // Already existed
        }
    }

    /// Get an article by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT id, source_id, title, link, summary, published_at, posted_at, created_at
            FROM articles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Article::try_from).transpose()
    }

    /// List unposted articles published at or after `threshold`, oldest first.
    pub async fn unposted_since(
        &self,
        threshold: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT id, source_id, title, link, summary, published_at, posted_at, created_at
            FROM articles
            WHERE posted_at IS NULL AND published_at >= $1
            ORDER BY published_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(format_timestamp(&threshold))
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Article::try_from).collect()
    }

    /// Mark an article as posted now.
    ///
    /// Returns `false` if the article does not exist or was already posted;
    /// an existing `posted_at` is never overwritten.
    pub async fn mark_posted(&self, id: i64) -> Result<bool> {
        let posted_at = format_timestamp(&Utc::now());

        let result =
            sqlx::query("UPDATE articles SET posted_at = $1 WHERE id = $2 AND posted_at IS NULL")
                .bind(&posted_at)
                .bind(id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all stored articles.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Count articles not yet posted.
    pub async fn count_unposted(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE posted_at IS NULL")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
