//! Source repository for feedcast.

use chrono::Utc;

use super::types::{NewSource, Source};
use crate::db::{decode_timestamp, format_timestamp, DbPool};
use crate::{FeedcastError, Result};

/// Row type for a source from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SourceRow {
    id: i64,
    name: String,
    feed_url: String,
    created_at: String,
}

impl TryFrom<SourceRow> for Source {
    type Error = FeedcastError;

    fn try_from(row: SourceRow) -> Result<Self> {
        Ok(Source {
            id: row.id,
            name: row.name,
            feed_url: row.feed_url,
            created_at: decode_timestamp("sources.created_at", &row.created_at)?,
        })
    }
}

/// Repository for the source registry.
pub struct SourceRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SourceRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Register a new source.
    ///
    /// Registering a URL that already exists is a database error.
    pub async fn create(&self, source: &NewSource) -> Result<Source> {
        let created_at = format_timestamp(&Utc::now());

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sources (name, feed_url, created_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&source.name)
        .bind(&source.feed_url)
        .bind(&created_at)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| crate::FeedcastError::NotFound("source".to_string()))
    }

    /// Get a source by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Source>> {
        let row = sqlx::query_as::<_, SourceRow>(
            "SELECT id, name, feed_url, created_at FROM sources WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Source::try_from).transpose()
    }

    /// Get a source by its feed URL.
    pub async fn get_by_url(&self, feed_url: &str) -> Result<Option<Source>> {
        let row = sqlx::query_as::<_, SourceRow>(
            "SELECT id, name, feed_url, created_at FROM sources WHERE feed_url = $1",
        )
        .bind(feed_url)
        .fetch_optional(self.pool)
        .await?;

        row.map(Source::try_from).transpose()
    }

    /// List all sources ordered by ID.
    pub async fn list(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            "SELECT id, name, feed_url, created_at FROM sources ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Source::try_from).collect()
    }

    /// Count registered sources.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
