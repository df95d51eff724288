//! Source adapter capability.
//!
//! A [`FeedSource`] turns one registered source into a batch of raw items.
//! New kinds of sources are added by implementing the trait and handing out
//! instances through a [`SourceProvider`].

use std::sync::Arc;

use async_trait::async_trait;

use super::types::Source;
use crate::article::Item;
use crate::shutdown::Shutdown;
use crate::Result;

/// A fetchable feed source.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Registry ID of the source.
    fn id(&self) -> i64;

    /// Display name of the source.
    fn name(&self) -> &str;

    /// Fetch the current items.
    ///
    /// Implementations must return [`crate::FeedcastError::Cancelled`]
    /// promptly once `shutdown` fires.
    async fn fetch(&self, shutdown: &Shutdown) -> Result<Vec<Item>>;
}

/// Builds adapters for registry records.
pub trait SourceProvider: Send + Sync {
    /// Create the adapter for `source`.
    fn adapter(&self, source: &Source) -> Arc<dyn FeedSource>;
}
