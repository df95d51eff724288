//! Feed sources for feedcast.
//!
//! This module contains the source registry, the adapter capability used by
//! the fetch loop, and the RSS/Atom implementation of that capability.

pub mod adapter;
mod repository;
pub mod rss;
mod types;

pub use adapter::{FeedSource, SourceProvider};
pub use repository::SourceRepository;
pub use rss::{RssFetcher, RssSource, RssSourceProvider};
pub use types::{NewSource, Source};

use async_trait::async_trait;
use tracing::info;

use crate::config::SourceEntry;
use crate::db::Database;
use crate::Result;

/// Read access to the catalog of configured sources.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// All registered sources.
    async fn list_sources(&self) -> Result<Vec<Source>>;
}

#[async_trait]
impl SourceRegistry for Database {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        SourceRepository::new(self.pool()).list().await
    }
}

/// Register the configured sources, skipping URLs that are already known.
///
/// Returns the number of newly registered sources. Invalid URLs are
/// rejected before anything is written.
pub async fn seed_sources(db: &Database, entries: &[SourceEntry]) -> Result<usize> {
    for entry in entries {
        rss::validate_url(&entry.url)?;
    }

    let repo = SourceRepository::new(db.pool());
    let mut created = 0;

    for entry in entries {
        if repo.get_by_url(&entry.url).await?.is_some() {
            continue;
        }
        let source = repo.create(&NewSource::new(&entry.name, &entry.url)).await?;
        info!(id = source.id, name = %source.name, "Registered source");
        created += 1;
    }

    Ok(created)
}
