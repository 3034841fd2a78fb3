//! Startup configuration.
//!
//! The monitor settings come from a JSON file (or TOML when the file ends in
//! `.toml`); credentials come from the environment. Both are loaded once and
//! are read-only afterwards.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const DISCORD_WEBHOOK_URL_VAR: &str = "DISCORD_WEBHOOK_URL";

pub const DEFAULT_SLEEP_TIME_SECS: u64 = 3600;
pub const DEFAULT_AI_DELAY_SECS: u64 = 60;
pub const DEFAULT_FETCH_DELAY_SECS: u64 = 2;
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_FEED_BASE_URL: &str = "https://www.reddit.com";
pub const DEFAULT_HISTORY_FILE: &str = "history.txt";
pub const DEFAULT_LOG_FILE: &str = "monitor.log";
pub const PROMPT_PLACEHOLDER: &str = "{text}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    pub subreddits: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(default = "default_sleep_time")]
    pub sleep_time: u64,
    #[serde(default = "default_ai_delay")]
    pub ai_delay: u64,
    #[serde(default = "default_fetch_delay")]
    pub fetch_delay: u64,
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_feed_base_url")]
    pub feed_base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_sleep_time() -> u64 {
    DEFAULT_SLEEP_TIME_SECS
}

fn default_ai_delay() -> u64 {
    DEFAULT_AI_DELAY_SECS
}

fn default_fetch_delay() -> u64 {
    DEFAULT_FETCH_DELAY_SECS
}

fn default_history_file() -> PathBuf {
    PathBuf::from(DEFAULT_HISTORY_FILE)
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_feed_base_url() -> String {
    DEFAULT_FEED_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("subwatch/{}", env!("CARGO_PKG_VERSION"))
}

impl MonitorConfig {
    /// Reads, parses and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound { path: display.clone() },
            std::io::ErrorKind::PermissionDenied => {
                ConfigError::PermissionDenied { path: display.clone() }
            }
            _ => ConfigError::InvalidFormat {
                details: format!("{}: {}", display, e),
            },
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml_str(&raw)
        } else {
            Self::from_json_str(&raw)
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| ConfigError::InvalidFormat {
            details: e.to_string(),
        })?;
        config.validated()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validated()
    }

    /// Normalizes subreddit names and rejects settings the monitor cannot run with.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.subreddits.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one subreddit must be configured".to_string(),
            });
        }

        let mut subreddits = Vec::with_capacity(self.subreddits.len());
        for raw in &self.subreddits {
            let name = normalize_subreddit(raw);
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+')
            {
                return Err(ConfigError::InvalidValue {
                    field: "subreddits".to_string(),
                    value: raw.clone(),
                });
            }
            if !subreddits.contains(&name) {
                subreddits.push(name);
            }
        }
        self.subreddits = subreddits;

        if self.keywords.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one keyword must be configured".to_string(),
            });
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "keywords".to_string(),
                value: "<blank>".to_string(),
            });
        }

        if self.sleep_time == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sleep_time".to_string(),
                value: "0".to_string(),
            });
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "model".to_string(),
                value: self.model.clone(),
            });
        }

        if let Some(prompt) = &self.prompt {
            if !prompt.contains(PROMPT_PLACEHOLDER) {
                return Err(ConfigError::ValidationFailed {
                    reason: format!("prompt must contain the {} placeholder", PROMPT_PLACEHOLDER),
                });
            }
        }

        parse_http_url("feed_base_url", &self.feed_base_url)?;

        Ok(self)
    }

    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs(self.sleep_time)
    }

    pub fn ai_delay(&self) -> Duration {
        Duration::from_secs(self.ai_delay)
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_secs(self.fetch_delay)
    }
}

fn normalize_subreddit(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    trimmed
        .strip_prefix("r/")
        .or_else(|| trimmed.strip_prefix("R/"))
        .unwrap_or(trimmed)
        .to_string()
}

fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    };
    let url = Url::parse(value).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

/// Credentials pulled from the environment.
#[derive(Clone)]
pub struct Secrets {
    pub gemini_api_key: String,
    pub discord_webhook_url: Url,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("gemini_api_key", &"<redacted>")
            .field("discord_webhook_url", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                    var_name: name.to_string(),
                })
        };

        let gemini_api_key = required(GEMINI_API_KEY_VAR)?;
        let webhook = required(DISCORD_WEBHOOK_URL_VAR)?;
        let discord_webhook_url = parse_http_url(DISCORD_WEBHOOK_URL_VAR, &webhook)?;

        Ok(Self {
            gemini_api_key,
            discord_webhook_url,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub secrets: Secrets,
}

impl AppConfig {
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self {
            monitor: MonitorConfig::load(config_path)?,
            secrets: Secrets::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const MINIMAL_JSON: &str = r#"{
        "subreddits": ["rust", "r/programming"],
        "keywords": ["crash", "error 500"]
    }"#;

    #[test]
    fn test_json_defaults() {
        let config = MonitorConfig::from_json_str(MINIMAL_JSON).unwrap();
        assert_eq!(config.subreddits, vec!["rust", "programming"]);
        assert_eq!(config.keywords, vec!["crash", "error 500"]);
        assert_eq!(config.sleep_time, DEFAULT_SLEEP_TIME_SECS);
        assert_eq!(config.ai_delay, DEFAULT_AI_DELAY_SECS);
        assert_eq!(config.fetch_delay, DEFAULT_FETCH_DELAY_SECS);
        assert_eq!(config.history_file, PathBuf::from("history.txt"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.prompt.is_none());
        assert!(config.user_agent.starts_with("subwatch/"));
    }

    #[test]
    fn test_toml_config() {
        let raw = r#"
            subreddits = ["rust"]
            keywords = ["panic"]
            sleep_time = 600
            ai_delay = 15
        "#;
        let config = MonitorConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.sleep_interval(), Duration::from_secs(600));
        assert_eq!(config.ai_delay(), Duration::from_secs(15));
    }

    #[test]
    fn test_load_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("config.json");
        std::fs::File::create(&json_path)
            .unwrap()
            .write_all(MINIMAL_JSON.as_bytes())
            .unwrap();
        assert!(MonitorConfig::load(&json_path).is_ok());

        let toml_path = dir.path().join("config.toml");
        std::fs::write(&toml_path, "subreddits = [\"rust\"]\nkeywords = [\"bug\"]\n").unwrap();
        assert!(MonitorConfig::load(&toml_path).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = MonitorConfig::load("/definitely/not/here/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = MonitorConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat { .. }));
    }

    #[test]
    fn test_rejects_empty_lists() {
        let err = MonitorConfig::from_json_str(r#"{"subreddits": [], "keywords": ["a"]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { .. }));

        let err = MonitorConfig::from_json_str(r#"{"subreddits": ["a"], "keywords": []}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { .. }));
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = MonitorConfig::from_json_str(
            r#"{"subreddits": ["a"], "keywords": ["b"], "sleep_time": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "sleep_time"));

        let err = MonitorConfig::from_json_str(r#"{"subreddits": ["bad name"], "keywords": ["b"]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "subreddits"));

        let err = MonitorConfig::from_json_str(r#"{"subreddits": ["a"], "keywords": ["  "]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "keywords"));

        let err = MonitorConfig::from_json_str(
            r#"{"subreddits": ["a"], "keywords": ["b"], "prompt": "no placeholder"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { .. }));

        let err = MonitorConfig::from_json_str(
            r#"{"subreddits": ["a"], "keywords": ["b"], "feed_base_url": "ftp://example.com"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "feed_base_url"));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = MonitorConfig::from_json_str(
            r#"{"subreddits": ["a"], "keywords": ["b"], "sleeptime": 5}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat { .. }));
    }

    #[test]
    fn test_duplicate_subreddits_collapse() {
        let config =
            MonitorConfig::from_json_str(r#"{"subreddits": ["rust", "/r/rust/"], "keywords": ["b"]}"#)
                .unwrap();
        assert_eq!(config.subreddits, vec!["rust"]);
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_secrets_from_lookup() {
        let secrets = Secrets::from_lookup(lookup(&[
            (GEMINI_API_KEY_VAR, "AIza-test"),
            (DISCORD_WEBHOOK_URL_VAR, "https://discord.com/api/webhooks/1/abc"),
        ]))
        .unwrap();
        assert_eq!(secrets.gemini_api_key, "AIza-test");
        assert_eq!(secrets.discord_webhook_url.host_str(), Some("discord.com"));

        let debug = format!("{:?}", secrets);
        assert!(!debug.contains("AIza-test"));
    }

    #[test]
    fn test_missing_secrets() {
        let err = Secrets::from_lookup(lookup(&[(
            DISCORD_WEBHOOK_URL_VAR,
            "https://discord.com/api/webhooks/1/abc",
        )]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnvironmentVariable { ref var_name } if var_name == GEMINI_API_KEY_VAR
        ));

        let err = Secrets::from_lookup(lookup(&[
            (GEMINI_API_KEY_VAR, "key"),
            (DISCORD_WEBHOOK_URL_VAR, "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvironmentVariable { .. }));
    }

    #[test]
    fn test_invalid_webhook_url() {
        let err = Secrets::from_lookup(lookup(&[
            (GEMINI_API_KEY_VAR, "key"),
            (DISCORD_WEBHOOK_URL_VAR, "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
