use async_trait::async_trait;
use chrono::Local;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use subwatch_core::{CoreError, NotifyError, Post};
use tracing::{debug, info};
use url::Url;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
const EMBED_COLOR_RED: u32 = 16_711_680;
const MAX_EMBED_TITLE_CHARS: usize = 256;
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, post: &Post, keyword: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookMessage {
    pub content: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub description: String,
    pub color: u32,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

/// Posts alerts to a Discord channel webhook.
#[derive(Debug)]
pub struct DiscordWebhook {
    http_client: Client,
    webhook_url: Url,
    verified_by: String,
    timeout: Duration,
}

impl DiscordWebhook {
    /// `verified_by` names the classifier in the embed description.
    pub fn new(webhook_url: Url, verified_by: impl Into<String>) -> Result<Self, CoreError> {
        Ok(Self {
            http_client: Client::builder().build()?,
            webhook_url,
            verified_by: verified_by.into(),
            timeout: WEBHOOK_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_message(&self, post: &Post, keyword: &str) -> WebhookMessage {
        let title: String = post.title.chars().take(MAX_EMBED_TITLE_CHARS).collect();

        WebhookMessage {
            content: format!("**POTENTIAL ISSUE DETECTED: {}**", keyword.to_uppercase()),
            embeds: vec![Embed {
                title,
                url: embed_url(&post.link),
                description: format!(
                    "Source: r/{}\nKeyword: **{}**\nVerified by {}",
                    post.subreddit, keyword, self.verified_by
                ),
                color: EMBED_COLOR_RED,
                footer: EmbedFooter {
                    text: format!(
                        "subwatch v{} | {}",
                        env!("CARGO_PKG_VERSION"),
                        Local::now().format("%Y-%m-%d %H:%M:%S")
                    ),
                },
            }],
        }
    }
}

/// Discord refuses embeds whose `url` is not http(s), so anything else is left out.
fn embed_url(link: &str) -> Option<String> {
    match Url::parse(link) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(link.to_string()),
        _ => {
            debug!("Leaving non-web link {:?} out of the embed", link);
            None
        }
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn notify(&self, post: &Post, keyword: &str) -> Result<(), NotifyError> {
        let message = self.build_message(post, keyword);
        debug!("Sending webhook for {}", post.link);

        let response = self
            .http_client
            .post(self.webhook_url.clone())
            .json(&message)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout
                } else {
                    NotifyError::Delivery {
                        details: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status.is_success() {
            info!("Notification sent for '{}'", post.title);
            return Ok(());
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<f64>().ok())
                .map(|secs| secs.ceil() as u64)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(NotifyError::RateLimited { retry_after });
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status_code: status.as_u16(),
            body,
        })
    }
}
