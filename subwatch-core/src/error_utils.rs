use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn retry_after(&self) -> Option<Duration>;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Fetch(e) => {
                error!("Feed error details: {:?}", e);
            }
            CoreError::History(e) => {
                error!("History error details: {:?}", e);
            }
            CoreError::Classification(e) => {
                error!("Classification error details: {:?}", e);
            }
            CoreError::Notify(e) => {
                error!("Notification error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            CoreError::Network(e) => {
                error!("Network error details: {:?}", e);
            }
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Fetch(e) => e.retry_after(),
            CoreError::Classification(e) => e.retry_after(),
            CoreError::Notify(e) => e.retry_after(),
            _ => None,
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Fetch(_) => "FETCH".to_string(),
            CoreError::History(_) => "HISTORY".to_string(),
            CoreError::Classification(_) => "CLASSIFICATION".to_string(),
            CoreError::Notify(_) => "NOTIFY".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
        }
    }
}

impl ErrorExt for FetchError {
    fn log_error(&self) -> &Self {
        error!("FetchError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("FetchError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimitExceeded { retry_after, .. } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn error_code(&self) -> String {
        match self {
            FetchError::SubredditNotFound { .. } => "FETCH_SUBREDDIT_NOT_FOUND".to_string(),
            FetchError::Forbidden { .. } => "FETCH_FORBIDDEN".to_string(),
            FetchError::RateLimitExceeded { .. } => "FETCH_RATE_LIMIT".to_string(),
            FetchError::ServerError { .. } => "FETCH_SERVER_ERROR".to_string(),
            FetchError::UnexpectedStatus { .. } => "FETCH_UNEXPECTED_STATUS".to_string(),
            FetchError::RequestTimeout { .. } => "FETCH_TIMEOUT".to_string(),
            FetchError::Network { .. } => "FETCH_NETWORK".to_string(),
            FetchError::InvalidFeed { .. } => "FETCH_INVALID_FEED".to_string(),
        }
    }
}

impl ErrorExt for HistoryError {
    fn log_error(&self) -> &Self {
        error!("HistoryError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("HistoryError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn error_code(&self) -> String {
        match self {
            HistoryError::Load { .. } => "HISTORY_LOAD_FAILED".to_string(),
            HistoryError::Write { .. } => "HISTORY_WRITE_FAILED".to_string(),
        }
    }
}

impl ErrorExt for ClassificationError {
    fn log_error(&self) -> &Self {
        error!("ClassificationError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ClassificationError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ClassificationError::RateLimitExceeded { retry_after, .. } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn error_code(&self) -> String {
        match self {
            ClassificationError::AuthenticationFailed { .. } => "LLM_AUTH_FAILED".to_string(),
            ClassificationError::RateLimitExceeded { .. } => "LLM_RATE_LIMIT".to_string(),
            ClassificationError::InvalidPrompt { .. } => "LLM_INVALID_PROMPT".to_string(),
            ClassificationError::ContentFiltered { .. } => "LLM_CONTENT_FILTERED".to_string(),
            ClassificationError::ServiceUnavailable { .. } => {
                "LLM_SERVICE_UNAVAILABLE".to_string()
            }
            ClassificationError::RequestFailed { .. } => "LLM_REQUEST_FAILED".to_string(),
            ClassificationError::RequestTimeout { .. } => "LLM_TIMEOUT".to_string(),
            ClassificationError::Network { .. } => "LLM_NETWORK".to_string(),
            ClassificationError::InvalidResponseFormat { .. } => {
                "LLM_INVALID_RESPONSE".to_string()
            }
        }
    }
}

impl ErrorExt for NotifyError {
    fn log_error(&self) -> &Self {
        error!("NotifyError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("NotifyError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            NotifyError::RateLimited { retry_after } => Some(Duration::from_secs(*retry_after)),
            _ => None,
        }
    }

    fn error_code(&self) -> String {
        match self {
            NotifyError::RateLimited { .. } => "NOTIFY_RATE_LIMIT".to_string(),
            NotifyError::Rejected { .. } => "NOTIFY_REJECTED".to_string(),
            NotifyError::Timeout => "NOTIFY_TIMEOUT".to_string(),
            NotifyError::Delivery { .. } => "NOTIFY_DELIVERY_FAILED".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED".to_string(),
            ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs monitor errors at the right level, with the code and any back-off hint.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        if let Some(retry_after) = error.retry_after() {
            info!("Service asked us to back off for {:?}", retry_after);
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        error.log_warn();
    }
}
