//! feedcast - feed ingestion and digest publishing service
//!
//! Polls a set of news feeds, stores new articles, and republishes
//! summaries of them to a channel on a slower, independent schedule.

pub mod article;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod publish;
pub mod shutdown;
pub mod source;
pub mod summary;

pub use article::{Article, ArticleRepository, ArticleStore, Item, NewArticle};
pub use config::Config;
pub use db::Database;
pub use error::{FeedcastError, Result};
pub use pipeline::{FetchReport, Fetcher, KeywordFilter, NotifyReport, Notifier};
pub use publish::{Publisher, TelegramPublisher};
pub use shutdown::Shutdown;
pub use source::{
    FeedSource, NewSource, RssSourceProvider, Source, SourceProvider, SourceRegistry,
    SourceRepository,
};
pub use summary::Summarizer;
