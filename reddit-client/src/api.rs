use crate::feed::parse_feed;
use crate::FeedSource;
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use subwatch_core::{CoreError, FetchError, MonitorConfig, Pacer, Post};
use tracing::{debug, error, info, warn};

const FEED_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Pulls `/r/{subreddit}/new/.rss` over HTTP.
///
/// Requests through one client are spaced by `fetch_delay`, so walking the
/// configured subreddit list never hammers Reddit.
#[derive(Debug)]
pub struct FeedClient {
    http_client: Client,
    base_url: String,
    timeout: Duration,
    pacer: Pacer,
}

impl FeedClient {
    pub fn new(base_url: &str, user_agent: &str, fetch_delay: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder().user_agent(user_agent).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: FEED_TIMEOUT,
            pacer: Pacer::new(fetch_delay),
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, CoreError> {
        Self::new(
            &config.feed_base_url,
            &config.user_agent,
            config.fetch_delay(),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn feed_url(&self, subreddit: &str) -> String {
        format!("{}/r/{}/new/.rss", self.base_url, subreddit)
    }

    async fn fetch_document(&self, subreddit: &str) -> Result<String, FetchError> {
        let permit = self.pacer.acquire().await;
        if !permit.waited.is_zero() {
            debug!("Waited {:?} before fetching r/{}", permit.waited, subreddit);
        }

        let url = self.feed_url(subreddit);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(subreddit, e))?;

        if !response.status().is_success() {
            return Err(status_error(subreddit, &response));
        }

        response
            .text()
            .await
            .map_err(|e| transport_error(subreddit, e))
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch(&self, subreddit: &str) -> Result<Vec<Post>, FetchError> {
        let document = self.fetch_document(subreddit).await?;
        let posts = parse_feed(subreddit, &document)?;
        info!("Retrieved {} posts from r/{}", posts.len(), subreddit);
        Ok(posts)
    }
}

fn status_error(subreddit: &str, response: &Response) -> FetchError {
    let status = response.status();
    let subreddit = subreddit.to_string();

    match status {
        StatusCode::NOT_FOUND => FetchError::SubredditNotFound { subreddit },
        StatusCode::FORBIDDEN => FetchError::Forbidden { subreddit },
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!(
                "Rate limited fetching r/{}, retry after {} seconds",
                subreddit, retry_after
            );
            FetchError::RateLimitExceeded {
                subreddit,
                retry_after,
            }
        }
        status if status.is_server_error() => {
            error!("Server error {} fetching r/{}", status, subreddit);
            FetchError::ServerError {
                subreddit,
                status_code: status.as_u16(),
            }
        }
        status => FetchError::UnexpectedStatus {
            subreddit,
            status_code: status.as_u16(),
        },
    }
}

fn transport_error(subreddit: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::RequestTimeout {
            subreddit: subreddit.to_string(),
        }
    } else {
        FetchError::Network {
            subreddit: subreddit.to_string(),
            details: e.to_string(),
        }
    }
}
