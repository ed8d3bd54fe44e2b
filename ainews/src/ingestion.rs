use anyhow::{Context, Result};
use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::{Client, StatusCode};
use std::fmt;

use crate::retry::RetryPolicy;

/// Non-success HTTP status returned by a feed host.
#[derive(Debug)]
pub struct FetchStatusError {
    pub url: String,
    pub status: StatusCode,
}

impl fmt::Display for FetchStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feed fetch for {} failed with status: {}", self.url, self.status)
    }
}

impl std::error::Error for FetchStatusError {}

/// Server errors, rate limiting and network failures are worth another
/// attempt. Other client errors (4xx) and parse failures are not.
pub fn is_transient(error: &anyhow::Error) -> bool {
    if let Some(err) = error.downcast_ref::<FetchStatusError>() {
        return err.status.is_server_error() || err.status == StatusCode::TOO_MANY_REQUESTS;
    }
    error.downcast_ref::<reqwest::Error>().is_some()
}

async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await.context("network error during fetch")?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchStatusError {
            url: url.to_string(),
            status,
        }
        .into());
    }

    let bytes = response.bytes().await.context("failed to read response body")?;
    Ok(bytes.to_vec())
}

/// Fetches a feed from the given URL and parses it (RSS, Atom or JSON Feed).
/// Transient fetch failures are retried according to `retry`; a body that
/// does not parse as a feed fails immediately.
pub async fn fetch_and_parse_feed(client: &Client, url: &str, retry: &RetryPolicy) -> Result<Feed> {
    let label = format!("feed fetch {}", url);
    let bytes = retry
        .run_classified(&label, |_| fetch_bytes(client, url), is_transient)
        .await?;

    parser::parse(bytes.as_slice()).with_context(|| format!("failed to parse feed {}", url))
}
