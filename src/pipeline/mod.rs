//! The fetch and notification loops.
//!
//! The two loops run independently and share nothing but the article store.

pub mod fetcher;
pub mod filter;
pub mod notifier;

pub use fetcher::{FetchReport, Fetcher};
pub use filter::KeywordFilter;
pub use notifier::{compose_message, NotifyReport, Notifier};
