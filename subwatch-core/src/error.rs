use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Feed error: {0}")]
    Fetch(#[from] FetchError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Subreddit not found: r/{subreddit}")]
    SubredditNotFound { subreddit: String },

    #[error("Forbidden access to r/{subreddit}")]
    Forbidden { subreddit: String },

    #[error("Rate limit exceeded for r/{subreddit}. Retry after {retry_after} seconds")]
    RateLimitExceeded { subreddit: String, retry_after: u64 },

    #[error("Server error {status_code} for r/{subreddit}")]
    ServerError { subreddit: String, status_code: u16 },

    #[error("Unexpected status {status_code} for r/{subreddit}")]
    UnexpectedStatus { subreddit: String, status_code: u16 },

    #[error("Request timeout for r/{subreddit}")]
    RequestTimeout { subreddit: String },

    #[error("Network failure for r/{subreddit}: {details}")]
    Network { subreddit: String, details: String },

    #[error("Invalid feed for r/{subreddit}: {details}")]
    InvalidFeed { subreddit: String, details: String },
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to load history file {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to history file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Provider authentication failed: {provider}")]
    AuthenticationFailed { provider: String },

    #[error("Rate limit exceeded for {provider}. Retry after {retry_after} seconds")]
    RateLimitExceeded { provider: String, retry_after: u64 },

    #[error("Invalid prompt: {reason}")]
    InvalidPrompt { reason: String },

    #[error("Content filtered by provider: {reason}")]
    ContentFiltered { reason: String },

    #[error("Provider service unavailable: {provider} ({status_code})")]
    ServiceUnavailable { provider: String, status_code: u16 },

    #[error("Request to {provider} failed with status {status_code}")]
    RequestFailed { provider: String, status_code: u16 },

    #[error("Request timeout for {provider}")]
    RequestTimeout { provider: String },

    #[error("Network failure talking to {provider}: {details}")]
    Network { provider: String, details: String },

    #[error("Invalid response format from {provider}: {details}")]
    InvalidResponseFormat { provider: String, details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Webhook rate limited. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Webhook rejected the message with status {status_code}: {body}")]
    Rejected { status_code: u16, body: String },

    #[error("Webhook request timed out")]
    Timeout,

    #[error("Webhook delivery failed: {details}")]
    Delivery { details: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Permission denied accessing config: {path}")]
    PermissionDenied { path: String },

    #[error("Invalid configuration format: {details}")]
    InvalidFormat { details: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
