//! Test helpers for pipeline integration tests.
//!
//! Provides stub collaborators (sources, summarizer, publisher, stores) and
//! helper functions for building a pipeline against an in-memory database.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use feedcast::config::SourceEntry;
use feedcast::{
    Article, ArticleRepository, ArticleStore, Config, Database, FeedSource, FeedcastError, Item,
    NewArticle, NewSource, Publisher, Result, Shutdown, Source, SourceProvider, SourceRegistry,
    SourceRepository, Summarizer,
};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Destination used by the test configuration.
pub const TEST_CHANNEL: &str = "@feedcast_test";

/// Open a fresh in-memory database.
pub async fn setup_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().await.unwrap())
}

/// Register a source and return it.
pub async fn register(db: &Database, name: &str, url: &str) -> Source {
    SourceRepository::new(db.pool())
        .create(&NewSource::new(name, url))
        .await
        .unwrap()
}

/// Store an article published `age` ago and return its ID.
pub async fn store_article(db: &Database, source_id: i64, title: &str, age: Duration) -> i64 {
    let published_at = Utc::now() - chrono::Duration::from_std(age).unwrap();
    store_article_at(db, source_id, title, published_at).await
}

/// Store an article with an explicit publication time and return its ID.
pub async fn store_article_at(
    db: &Database,
    source_id: i64,
    title: &str,
    published_at: DateTime<Utc>,
) -> i64 {
    let link = format!("https://example.com/{}", title.replace(' ', "-"));
    ArticleRepository::new(db.pool())
        .store(&NewArticle::new(source_id, title, link, published_at).with_summary(title))
        .await
        .unwrap()
        .unwrap()
}

/// Load an article by ID.
pub async fn article(db: &Database, id: i64) -> Article {
    ArticleRepository::new(db.pool())
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
}

/// Configuration that passes validation.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.telegram.bot_token = "123:test".to_string();
    config.telegram.channel_id = TEST_CHANNEL.to_string();
    config.fetcher.interval_secs = 60;
    config.notifier.interval_secs = 120;
    config.notifier.batch_size = 5;
    config.sources = vec![SourceEntry {
        name: "Example".to_string(),
        url: "https://example.com/feed.xml".to_string(),
    }];
    config
}

/// An item published `minutes` minutes ago.
pub fn item(title: &str, link: &str, minutes: i64) -> Item {
    Item::new(title, link).with_published_at(Utc::now() - chrono::Duration::minutes(minutes))
}

/// Poll `condition` until it holds or `DEFAULT_TIMEOUT` passes.
pub async fn wait_until<F, Fut>(condition: F) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + DEFAULT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition().await
}

// ============================================================================
// Sources
// ============================================================================

/// What a stub source does when fetched.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return these items.
    Items(Vec<Item>),
    /// Wait, then return these items.
    Delayed(Duration, Vec<Item>),
    /// Fail with a source error.
    Fail(String),
    /// Block until shutdown, then report cancellation.
    WaitForShutdown,
}

/// Feed source driven by a [`Behavior`].
pub struct StubSource {
    id: i64,
    name: String,
    behavior: Behavior,
    completed: Arc<AtomicUsize>,
}

#[async_trait]
impl FeedSource for StubSource {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, shutdown: &Shutdown) -> Result<Vec<Item>> {
        let result = match &self.behavior {
            Behavior::Items(items) => Ok(items.clone()),
            Behavior::Delayed(delay, items) => {
                tokio::time::sleep(*delay).await;
                Ok(items.clone())
            }
            Behavior::Fail(message) => Err(FeedcastError::Source(message.clone())),
            Behavior::WaitForShutdown => {
                shutdown.cancelled().await;
                Err(FeedcastError::Cancelled)
            }
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// Provider mapping feed URLs to stub behaviors.
///
/// Sources without a configured behavior return no items.
#[derive(Default)]
pub struct StubProvider {
    behaviors: HashMap<String, Behavior>,
    completed: Arc<AtomicUsize>,
}

impl StubProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the behavior for a feed URL.
    pub fn with(mut self, feed_url: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(feed_url.to_string(), behavior);
        self
    }

    /// Number of fetches that ran to completion.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl SourceProvider for StubProvider {
    fn adapter(&self, source: &Source) -> Arc<dyn FeedSource> {
        Arc::new(StubSource {
            id: source.id,
            name: source.name.clone(),
            behavior: self
                .behaviors
                .get(&source.feed_url)
                .cloned()
                .unwrap_or(Behavior::Items(Vec::new())),
            completed: Arc::clone(&self.completed),
        })
    }
}

/// Registry that fails while `failing` is set, then delegates.
pub struct FlakyRegistry {
    pub inner: Arc<Database>,
    pub failing: AtomicBool,
}

#[async_trait]
impl SourceRegistry for FlakyRegistry {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FeedcastError::Database("registry unavailable".to_string()));
        }
        self.inner.list_sources().await
    }
}

// ============================================================================
// Store
// ============================================================================

/// Article store that fails for chosen links or on mark_posted.
pub struct FlakyStore {
    inner: Arc<Database>,
    fail_links: Mutex<HashSet<String>>,
    fail_mark: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<Database>) -> Self {
        Self {
            inner,
            fail_links: Mutex::new(HashSet::new()),
            fail_mark: AtomicBool::new(false),
        }
    }

    /// Make storing `link` fail.
    pub fn fail_link(&self, link: &str) {
        self.fail_links.lock().unwrap().insert(link.to_string());
    }

    /// Make mark_posted fail or succeed.
    pub fn set_fail_mark(&self, fail: bool) {
        self.fail_mark.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArticleStore for FlakyStore {
    async fn store(&self, article: &NewArticle) -> Result<Option<i64>> {
        if self.fail_links.lock().unwrap().contains(&article.link) {
            return Err(FeedcastError::Database("disk full".to_string()));
        }
        self.inner.store(article).await
    }

    async fn unposted_since(&self, threshold: DateTime<Utc>, limit: u32) -> Result<Vec<Article>> {
        self.inner.unposted_since(threshold, limit).await
    }

    async fn mark_posted(&self, article_id: i64) -> Result<bool> {
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(FeedcastError::Database("database is locked".to_string()));
        }
        self.inner.mark_posted(article_id).await
    }
}

// ============================================================================
// Summarizer and publisher
// ============================================================================

/// Summarizer returning "digest: <title>" and failing for chosen titles.
#[derive(Default)]
pub struct ScriptedSummarizer {
    fail_titles: Mutex<HashSet<String>>,
    calls: Mutex<Vec<i64>>,
}

impl ScriptedSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make summarizing `title` fail.
    pub fn fail_for(&self, title: &str) {
        self.fail_titles.lock().unwrap().insert(title.to_string());
    }

    /// Let `title` succeed again.
    pub fn recover(&self, title: &str) {
        self.fail_titles.lock().unwrap().remove(title);
    }

    /// IDs of articles summarized so far, in call order.
    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, article: &Article) -> Result<String> {
        self.calls.lock().unwrap().push(article.id);
        if self.fail_titles.lock().unwrap().contains(&article.title) {
            return Err(FeedcastError::Summarizer("model overloaded".to_string()));
        }
        Ok(format!("digest: {}", article.title))
    }
}

/// Publisher recording every message it accepts.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every publish fail or succeed.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every publish.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Accepted messages as (destination, text).
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    /// Accepted message texts.
    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, destination: &str, text: &str) -> Result<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FeedcastError::Publisher("Bad Gateway".to_string()));
        }
        self.messages
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }
}
