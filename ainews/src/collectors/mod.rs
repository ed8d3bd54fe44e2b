use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::item::NewsItem;

pub mod feeds;
pub mod hacker_news;
pub mod reddit;

pub use feeds::FeedCollector;
pub use hacker_news::HackerNewsCollector;
pub use reddit::RedditCollector;

pub const USER_AGENT: &str = "ainews/0.1.0 (AI news digest)";

/// Default per-request timeout for every upstream source.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A source of candidate news items.
///
/// Implementations apply the relevance filter themselves and swallow
/// per-record and per-subsource failures; an `Err` means the whole source
/// was unavailable and the pipeline treats it as an empty contribution.
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    /// Upper bound on items this collector returns in one run
    fn limit(&self) -> usize;

    async fn collect(&self, limit: usize) -> Result<Vec<NewsItem>>;
}

pub(crate) fn http_client(timeout_secs: u64, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .build()
        .context("failed to build reqwest client")
}
