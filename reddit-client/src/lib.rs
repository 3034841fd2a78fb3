use async_trait::async_trait;
use subwatch_core::{FetchError, Post};

pub mod api;
pub mod feed;

pub use api::FeedClient;
pub use feed::parse_feed;

#[cfg(test)]
mod tests;

/// Source of recent posts for a subreddit.
///
/// `FeedClient` is the production implementation; the monitor only depends on
/// this trait so tests can script feed results.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, subreddit: &str) -> Result<Vec<Post>, FetchError>;
}
