//! Client for the remote per-forum "new posts" JSON listing.

mod listing;

pub use listing::{parse_listing, ListingResponse, RawPost};

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::constants::SOURCE_USER_AGENT;

/// Why a listing could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("still rate limited after retry")]
    RateLimited,
    #[error("malformed listing: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Fetches raw post listings for named forums.
#[derive(Debug, Clone)]
pub struct SourceClient {
    client: Client,
    base_url: String,
    retry_delay: Duration,
    activity: Option<ActivityLog>,
}

impl SourceClient {
    /// Create a client for the configured source.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(SOURCE_USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.source_base_url.trim_end_matches('/').to_string(),
            retry_delay: config.rate_limit_retry_delay,
            activity: None,
        })
    }

    /// Record retries in `activity` as well as in `tracing`.
    #[must_use]
    pub fn with_activity(mut self, activity: ActivityLog) -> Self {
        self.activity = Some(activity);
        self
    }

    /// Listing URL for a forum.
    #[must_use]
    pub fn listing_url(&self, forum: &str, limit: u32) -> String {
        format!(
            "{}/r/{}/new.json?limit={limit}",
            self.base_url,
            urlencoding::encode(forum)
        )
    }

    /// Fetch up to `limit` newest posts of a forum.
    ///
    /// A 429 response is retried exactly once after the configured delay. The
    /// retry is recorded as a `source` warning in the activity log, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-200 status, a second 429,
    /// or a body that is not a JSON listing.
    pub async fn fetch_posts(&self, forum: &str, limit: u32) -> Result<Vec<RawPost>, FetchError> {
        let url = self.listing_url(forum, limit);

        let mut response = self.get(&url).await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            if let Some(activity) = &self.activity {
                activity
                    .warning(
                        "source",
                        "Rate limited, retrying",
                        Some(json!({
                            "forum": forum,
                            "delay_secs": self.retry_delay.as_secs_f64(),
                        })),
                    )
                    .await;
            } else {
                warn!(
                    forum = %forum,
                    delay_secs = self.retry_delay.as_secs_f32(),
                    "Rate limited, retrying once"
                );
            }
            sleep(self.retry_delay).await;
            response = self.get(&url).await?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                return Err(FetchError::RateLimited);
            }
        }

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        let posts = parse_listing(&body, &self.base_url)?;
        debug!(forum = %forum, count = posts.len(), "Fetched listing");
        Ok(posts)
    }

    /// Like [`Self::fetch_posts`], but logs any failure and yields no posts.
    ///
    /// The pipeline calls [`Self::fetch_posts`] instead, because it records the
    /// error on the forum's report and in the activity log.
    pub async fn fetch_or_empty(&self, forum: &str, limit: u32) -> Vec<RawPost> {
        match self.fetch_posts(forum, limit).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!(forum = %forum, "Failed to fetch listing: {e}");
                Vec::new()
            }
        }
    }

    async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.client.get(url).send().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url() {
        let config = Config {
            source_base_url: "https://www.reddit.com/".to_string(),
            ..Config::for_testing()
        };
        let client = SourceClient::new(&config).unwrap();
        assert_eq!(
            client.listing_url("n8n", 100),
            "https://www.reddit.com/r/n8n/new.json?limit=100"
        );
        assert_eq!(
            client.listing_url("a b", 5),
            "https://www.reddit.com/r/a%20b/new.json?limit=5"
        );
    }
}
