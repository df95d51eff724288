//! Cooperative shutdown signalling.
//!
//! A single [`Shutdown`] is created at startup and cloned into every loop
//! and every per-source task. Triggering any clone is observed by all of them.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::{FeedcastError, Result};

/// Process-wide cancellation token.
#[derive(Clone, Debug)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    /// Create a token that has not been triggered.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown has been requested.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of this token, so an error
        // here cannot happen while `self` is alive.
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }

    /// Run `future` unless shutdown is requested first.
    ///
    /// Returns [`FeedcastError::Cancelled`] when the token fires before the
    /// future completes; the future is dropped in that case.
    pub async fn guard<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(FeedcastError::Cancelled),
            output = future => Ok(output),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
