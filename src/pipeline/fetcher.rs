//! Fetch loop.
//!
//! On every tick the fetcher lists all registered sources, fetches each one
//! in its own task, filters the items and stores the survivors. A tick ends
//! only when every per-source task has finished.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::filter::KeywordFilter;
use crate::article::{ArticleStore, NewArticle};
use crate::config::FetcherConfig;
use crate::shutdown::Shutdown;
use crate::source::{FeedSource, SourceProvider, SourceRegistry};
use crate::{FeedcastError, Result};

/// Counters for one fetch tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Sources polled.
    pub sources: usize,
    /// Sources whose fetch or storage failed.
    pub failed_sources: usize,
    /// New articles stored.
    pub stored: usize,
    /// Items already present in the store.
    pub duplicates: usize,
    /// Items dropped by the keyword filter.
    pub filtered: usize,
}

impl FetchReport {
    fn absorb(&mut self, outcome: SourceOutcome) {
        self.stored += outcome.stored;
        self.duplicates += outcome.duplicates;
        self.filtered += outcome.filtered;
        if outcome.failed {
            self.failed_sources += 1;
        }
    }
}

#[derive(Debug, Default)]
struct SourceOutcome {
    stored: usize,
    duplicates: usize,
    filtered: usize,
    failed: bool,
}

impl SourceOutcome {
    fn failed() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }
}

/// State shared by the per-source tasks of a tick.
struct Ingest {
    store: Arc<dyn ArticleStore>,
    filter: KeywordFilter,
    source_timeout: Duration,
    max_items: usize,
}

impl Ingest {
    /// Fetch one source and store its surviving items.
    ///
    /// Never fails: every error is logged and recorded in the outcome.
    async fn run(&self, source: Arc<dyn FeedSource>, shutdown: Shutdown) -> SourceOutcome {
        let name = source.name().to_string();

        let fetched = tokio::time::timeout(self.source_timeout, source.fetch(&shutdown))
            .await
            .map_err(|_| {
                FeedcastError::Timeout(format!("no response within {:?}", self.source_timeout))
            })
            .and_then(|result| result);

        let items = match fetched {
            Ok(items) => items,
            Err(FeedcastError::Cancelled) => {
                debug!(source = %name, "Fetch abandoned on shutdown");
                return SourceOutcome::failed();
            }
            Err(e) => {
                warn!(source = %name, "Failed to fetch source: {}", e);
                return SourceOutcome::failed();
            }
        };

        let fetched_at = Utc::now();
        let mut outcome = SourceOutcome::default();

        for item in items.into_iter().take(self.max_items) {
            if self.filter.rejects(&item) {
                debug!(source = %name, title = %item.title, "Item filtered");
                outcome.filtered += 1;
                continue;
            }

            let article = NewArticle::from_item(source.id(), item, fetched_at);
            match shutdown.guard(self.store.store(&article)).await {
                Ok(Ok(Some(id))) => {
                    debug!(source = %name, article_id = id, "Stored {}", article.link);
                    outcome.stored += 1;
                }
                Ok(Ok(None)) => outcome.duplicates += 1,
                Ok(Err(e)) => {
                    error!(source = %name, "Failed to store {}: {}", article.link, e);
                    outcome.failed = true;
                    break;
                }
                Err(_) => {
                    debug!(source = %name, "Storing abandoned on shutdown");
                    break;
                }
            }
        }

        outcome
    }
}

/// The fetch coordinator.
pub struct Fetcher {
    registry: Arc<dyn SourceRegistry>,
    provider: Arc<dyn SourceProvider>,
    ingest: Arc<Ingest>,
    interval: Duration,
}

impl Fetcher {
    /// Create a fetcher from its collaborators and configuration.
    pub fn new(
        registry: Arc<dyn SourceRegistry>,
        store: Arc<dyn ArticleStore>,
        provider: Arc<dyn SourceProvider>,
        config: &FetcherConfig,
    ) -> Self {
        Self {
            registry,
            provider,
            ingest: Arc::new(Ingest {
                store,
                filter: KeywordFilter::new(config.filter_keywords.iter().cloned()),
                source_timeout: config.source_timeout(),
                max_items: config.max_items_per_source,
            }),
            interval: config.interval(),
        }
    }

    /// Override the per-source timeout.
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        if let Some(ingest) = Arc::get_mut(&mut self.ingest) {
            ingest.source_timeout = timeout;
        }
        self
    }

    /// Run the fetch loop until shutdown.
    ///
    /// The first tick starts immediately. Failed ticks are logged and retried
    /// on the next tick.
    pub async fn run(&self, shutdown: Shutdown) {
        info!(
            "Fetch loop started (interval: {} seconds)",
            self.interval.as_secs()
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            match self.fetch_once(&shutdown).await {
                Ok(report) => info!(
                    sources = report.sources,
                    failed = report.failed_sources,
                    stored = report.stored,
                    duplicates = report.duplicates,
                    filtered = report.filtered,
                    "Fetch tick completed"
                ),
                Err(FeedcastError::Cancelled) => break,
                Err(e) => error!("Fetch tick aborted: {}", e),
            }
        }

        info!("Fetch loop stopped");
    }

    /// Run a single fetch tick.
    ///
    /// Fails only when the source list cannot be loaded; per-source failures
    /// are counted in the report.
    pub async fn fetch_once(&self, shutdown: &Shutdown) -> Result<FetchReport> {
        let sources = shutdown.guard(self.registry.list_sources()).await??;

        let mut report = FetchReport {
            sources: sources.len(),
            ..FetchReport::default()
        };
        if sources.is_empty() {
            debug!("No sources registered");
            return Ok(report);
        }

        debug!("Fetching {} source(s)", sources.len());

        let handles: Vec<_> = sources
            .iter()
            .map(|source| {
                let adapter = self.provider.adapter(source);
                let ingest = Arc::clone(&self.ingest);
                let shutdown = shutdown.clone();
                tokio::spawn(async move { ingest.run(adapter, shutdown).await })
            })
            .collect();

        for (source, joined) in sources.iter().zip(futures::future::join_all(handles).await) {
            match joined {
                Ok(outcome) => report.absorb(outcome),
                Err(e) => {
                    error!(source = %source.name, "Source task failed: {}", e);
                    report.failed_sources += 1;
                }
            }
        }

        Ok(report)
    }
}
