//! Notification loop.
//!
//! On every tick the notifier selects the oldest unposted articles inside
//! the eligibility window, then summarizes, publishes and marks each one in
//! turn. An article is marked posted only after a successful publish.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::article::{Article, ArticleStore};
use crate::config::Config;
use crate::publish::{escape_html, Publisher};
use crate::shutdown::Shutdown;
use crate::summary::Summarizer;
use crate::{FeedcastError, Result};

/// Counters for one notification tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Articles selected for publication.
    pub selected: usize,
    /// Articles published and marked posted.
    pub posted: usize,
    /// Articles left unposted after a summarizer or publisher failure.
    pub skipped: usize,
    /// Articles published but not marked posted.
    pub mark_failed: usize,
}

/// The notification coordinator.
pub struct Notifier {
    store: Arc<dyn ArticleStore>,
    summarizer: Arc<dyn Summarizer>,
    publisher: Arc<dyn Publisher>,
    destination: String,
    interval: Duration,
    max_age: Duration,
    batch_size: u32,
}

impl Notifier {
    /// Create a notifier from its collaborators and configuration.
    pub fn new(
        store: Arc<dyn ArticleStore>,
        summarizer: Arc<dyn Summarizer>,
        publisher: Arc<dyn Publisher>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            summarizer,
            publisher,
            destination: config.telegram.channel_id.clone(),
            interval: config.notifier.interval(),
            max_age: config.max_age(),
            batch_size: config.notifier.batch_size,
        }
    }

    /// Override the eligibility window.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Run the notification loop until shutdown.
    pub async fn run(&self, shutdown: Shutdown) {
        info!(
            "Notification loop started (interval: {} seconds, max age: {} seconds)",
            self.interval.as_secs(),
            self.max_age.as_secs()
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            match self.notify_once(&shutdown).await {
                Ok(report) if report.selected == 0 => debug!("No articles to publish"),
                Ok(report) => info!(
                    selected = report.selected,
                    posted = report.posted,
                    skipped = report.skipped,
                    mark_failed = report.mark_failed,
                    "Notification tick completed"
                ),
                Err(FeedcastError::Cancelled) => break,
                Err(e) => error!("Notification tick aborted: {}", e),
            }
        }

        info!("Notification loop stopped");
    }

    /// Run a single notification tick.
    ///
    /// Fails only when the batch cannot be selected; per-article failures are
    /// counted in the report.
    pub async fn notify_once(&self, shutdown: &Shutdown) -> Result<NotifyReport> {
        let max_age = chrono::Duration::from_std(self.max_age)
            .map_err(|e| FeedcastError::Config(format!("invalid max age: {}", e)))?;
        let threshold = Utc::now()
            .checked_sub_signed(max_age)
            .ok_or_else(|| FeedcastError::Config(format!("max age out of range: {}", max_age)))?;

        let articles = shutdown
            .guard(self.store.unposted_since(threshold, self.batch_size))
            .await??;

        let mut report = NotifyReport {
            selected: articles.len(),
            ..NotifyReport::default()
        };

        for article in &articles {
            if shutdown.is_triggered() {
                debug!("Notification tick interrupted by shutdown");
                break;
            }

            match self.deliver(article, shutdown).await {
                Ok(()) => {}
                Err(FeedcastError::Cancelled) => {
                    debug!(article_id = article.id, "Delivery abandoned on shutdown");
                    break;
                }
                Err(e) => {
                    warn!(article_id = article.id, "Skipping article: {}", e);
                    report.skipped += 1;
                    continue;
                }
            }

            match self.store.mark_posted(article.id).await {
                Ok(true) => report.posted += 1,
                Ok(false) => {
                    warn!(article_id = article.id, "Article was already marked posted");
                    report.posted += 1;
                }
                Err(e) => {
                    error!(
                        article_id = article.id,
                        "Published but failed to mark posted: {}", e
                    );
                    report.mark_failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Summarize and publish one article.
    async fn deliver(&self, article: &Article, shutdown: &Shutdown) -> Result<()> {
        let digest = shutdown
            .guard(self.summarizer.summarize(article))
            .await??;

        let message = compose_message(article, &digest);
        shutdown
            .guard(self.publisher.publish(&self.destination, &message))
            .await??;

        debug!(article_id = article.id, "Published {}", article.link);
        Ok(())
    }
}

/// Build the channel message for an article in Telegram HTML.
pub fn compose_message(article: &Article, digest: &str) -> String {
    let title = escape_html(article.title.trim());
    let digest = escape_html(digest.trim());
    let link = escape_html(&article.link);

    if digest.is_empty() || digest == title {
        format!("<b>{title}</b>\n\n<a href=\"{link}\">{link}</a>")
    } else {
        format!("<b>{title}</b>\n\n{digest}\n\n<a href=\"{link}\">{link}</a>")
    }
}
