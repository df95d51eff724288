//! Configuration module for feedcast.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{FeedcastError, Result};

/// Upper bound for loop intervals and the publish window.
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feedcast.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty for console-only logging.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedcast.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Fetch loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Seconds between fetch ticks.
    #[serde(default = "default_fetch_interval")]
    pub interval_secs: u64,
    /// Upper bound on a single source's fetch, in seconds.
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
    /// Items considered per source per tick.
    #[serde(default = "default_max_items_per_source")]
    pub max_items_per_source: usize,
    /// Items whose title or categories match one of these are dropped.
    #[serde(default)]
    pub filter_keywords: Vec<String>,
    /// HTTP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// HTTP read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total HTTP request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
}

fn default_fetch_interval() -> u64 {
    300 // 5 minutes
}

fn default_source_timeout() -> u64 {
    45
}

fn default_max_items_per_source() -> usize {
    100
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    20
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl FetcherConfig {
    /// Interval between fetch ticks.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Hard limit for one source's fetch.
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_fetch_interval(),
            source_timeout_secs: default_source_timeout(),
            max_items_per_source: default_max_items_per_source(),
            filter_keywords: Vec::new(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
        }
    }
}

/// Notification loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Seconds between notification ticks. Must exceed the fetch interval.
    #[serde(default = "default_notify_interval")]
    pub interval_secs: u64,
    /// Eligibility window as a multiple of the fetch interval.
    #[serde(default = "default_max_age_multiplier")]
    pub max_age_multiplier: u32,
    /// Articles published per tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_notify_interval() -> u64 {
    600 // 10 minutes
}

fn default_max_age_multiplier() -> u32 {
    4
}

fn default_batch_size() -> u32 {
    5
}

impl NotifierConfig {
    /// Interval between notification ticks.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_notify_interval(),
            max_age_multiplier: default_max_age_multiplier(),
            batch_size: default_batch_size(),
        }
    }
}

/// Summarizer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    /// Summarizer backend: "excerpt" or "openai".
    #[serde(default = "default_summarizer_kind")]
    pub kind: String,
    /// API key for the openai backend.
    #[serde(default)]
    pub api_key: String,
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_summarizer_endpoint")]
    pub endpoint: String,
    /// Model name.
    #[serde(default = "default_summarizer_model")]
    pub model: String,
    /// System prompt sent with every request.
    #[serde(default = "default_summarizer_prompt")]
    pub prompt: String,
    /// Maximum digest length in characters.
    #[serde(default = "default_summary_max_length")]
    pub max_length: usize,
}

fn default_summarizer_kind() -> String {
    "excerpt".to_string()
}

fn default_summarizer_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_summarizer_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_summarizer_prompt() -> String {
    "Summarize the following news article in two or three sentences. \
     Reply with the summary only."
        .to_string()
}

fn default_summary_max_length() -> usize {
    400
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            kind: default_summarizer_kind(),
            api_key: String::new(),
            endpoint: default_summarizer_endpoint(),
            model: default_summarizer_model(),
            prompt: default_summarizer_prompt(),
            max_length: default_summary_max_length(),
        }
    }
}

/// Telegram channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token.
    #[serde(default)]
    pub bot_token: String,
    /// Destination channel (e.g. "@my_news" or a numeric chat id).
    #[serde(default)]
    pub channel_id: String,
    /// Bot API base URL.
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel_id: String::new(),
            api_base: default_telegram_api_base(),
        }
    }
}

/// A feed source registered at startup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceEntry {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Fetch loop configuration.
    #[serde(default)]
    pub fetcher: FetcherConfig,
    /// Notification loop configuration.
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Summarizer configuration.
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    /// Telegram configuration.
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Sources to register on startup.
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedcastError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedcastError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDCAST_DATABASE_PATH`
    /// - `FEEDCAST_TELEGRAM_BOT_TOKEN`
    /// - `FEEDCAST_OPENAI_API_KEY`
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = non_empty_env("FEEDCAST_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(token) = non_empty_env("FEEDCAST_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(key) = non_empty_env("FEEDCAST_OPENAI_API_KEY") {
            self.summarizer.api_key = key;
        }
    }

    /// How old an unposted article may be and still be published.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(
            self.fetcher
                .interval_secs
                .saturating_mul(u64::from(self.notifier.max_age_multiplier)),
        )
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.interval_secs == 0 {
            return Err(FeedcastError::Validation(
                "fetcher.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.notifier.interval_secs <= self.fetcher.interval_secs {
            return Err(FeedcastError::Validation(format!(
                "notifier.interval_secs ({}) must be greater than fetcher.interval_secs ({})",
                self.notifier.interval_secs, self.fetcher.interval_secs
            )));
        }
        if self.notifier.interval_secs > MAX_WINDOW_SECS {
            return Err(FeedcastError::Validation(format!(
                "notifier.interval_secs must not exceed {MAX_WINDOW_SECS}"
            )));
        }
        if self.max_age().as_secs() > MAX_WINDOW_SECS {
            return Err(FeedcastError::Validation(format!(
                "fetcher.interval_secs * notifier.max_age_multiplier must not exceed {MAX_WINDOW_SECS}"
            )));
        }
        if self.fetcher.source_timeout_secs == 0 {
            return Err(FeedcastError::Validation(
                "fetcher.source_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.notifier.batch_size == 0 {
            return Err(FeedcastError::Validation(
                "notifier.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.notifier.max_age_multiplier == 0 {
            return Err(FeedcastError::Validation(
                "notifier.max_age_multiplier must be at least 1".to_string(),
            ));
        }
        if self.telegram.bot_token.is_empty() {
            return Err(FeedcastError::Validation(
                "telegram.bot_token is not set. \
                 Set it in config.toml or via FEEDCAST_TELEGRAM_BOT_TOKEN."
                    .to_string(),
            ));
        }
        if self.telegram.channel_id.is_empty() {
            return Err(FeedcastError::Validation(
                "telegram.channel_id is not set".to_string(),
            ));
        }
        match self.summarizer.kind.as_str() {
            "excerpt" => {}
            "openai" => {
                if self.summarizer.api_key.is_empty() {
                    return Err(FeedcastError::Validation(
                        "summarizer.kind is \"openai\" but api_key is not set. \
                         Set it in config.toml or via FEEDCAST_OPENAI_API_KEY."
                            .to_string(),
                    ));
                }
            }
            other => {
                return Err(FeedcastError::Validation(format!(
                    "unknown summarizer kind: {other}"
                )));
            }
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
