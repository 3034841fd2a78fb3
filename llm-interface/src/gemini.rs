use crate::prompt::PromptTemplate;
use crate::LlmProvider;
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use subwatch_core::{ClassificationError, CoreError, MonitorConfig, Post, Secrets, Verdict};
use tracing::{debug, info, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const PROVIDER_NAME: &str = "gemini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Classifier backed by the Gemini `generateContent` REST endpoint.
#[derive(Debug)]
pub struct GeminiProvider {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
    prompt: PromptTemplate,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        prompt: PromptTemplate,
    ) -> Result<Self, CoreError> {
        let http_client = Client::builder().build()?;

        Ok(Self {
            http_client,
            base_url: GEMINI_API_BASE.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            prompt,
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn from_config(config: &MonitorConfig, secrets: &Secrets) -> Result<Self, CoreError> {
        let prompt = PromptTemplate::from_config(config.prompt.as_deref())?;
        Self::new(&secrets.gemini_api_key, &config.model, prompt)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(&self, post: &Post) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(self.prompt.render(post)),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        }
    }

    async fn generate(&self, post: &Post) -> Result<GenerateContentResponse, ClassificationError> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(post))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| ClassificationError::InvalidResponseFormat {
            provider: PROVIDER_NAME.to_string(),
            details: e.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn classify(&self, post: &Post) -> Result<Verdict, ClassificationError> {
        debug!("Classifying '{}' with {}", post.title, self.model);
        let response = self.generate(post).await?;
        let answer = answer_text(response)?;

        let verdict = match Verdict::parse(&answer) {
            Ok(verdict) => verdict,
            Err(unrecognized) => {
                warn!(
                    "Model returned {}; treating '{}' as not relevant",
                    unrecognized, post.title
                );
                Verdict::NotRelevant
            }
        };

        info!("Verdict for '{}': {}", post.title, verdict);
        Ok(verdict)
    }
}

fn answer_text(response: GenerateContentResponse) -> Result<String, ClassificationError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ClassificationError::ContentFiltered { reason });
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(ClassificationError::InvalidResponseFormat {
            provider: PROVIDER_NAME.to_string(),
            details: "response has no candidates".to_string(),
        });
    };

    let text: String = candidate
        .content
        .unwrap_or_default()
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                Err(ClassificationError::ContentFiltered {
                    reason: reason.to_string(),
                })
            }
            _ => Err(ClassificationError::InvalidResponseFormat {
                provider: PROVIDER_NAME.to_string(),
                details: "candidate has no text".to_string(),
            }),
        };
    }

    Ok(text)
}

async fn status_error(response: Response) -> ClassificationError {
    let status = response.status();
    let provider = PROVIDER_NAME.to_string();

    match status {
        StatusCode::BAD_REQUEST => {
            let body = response.text().await.unwrap_or_default();
            ClassificationError::InvalidPrompt { reason: body }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ClassificationError::AuthenticationFailed { provider }
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            ClassificationError::RateLimitExceeded {
                provider,
                retry_after,
            }
        }
        status if status.is_server_error() => ClassificationError::ServiceUnavailable {
            provider,
            status_code: status.as_u16(),
        },
        status => ClassificationError::RequestFailed {
            provider,
            status_code: status.as_u16(),
        },
    }
}

fn transport_error(e: reqwest::Error) -> ClassificationError {
    if e.is_timeout() {
        ClassificationError::RequestTimeout {
            provider: PROVIDER_NAME.to_string(),
        }
    } else {
        ClassificationError::Network {
            provider: PROVIDER_NAME.to_string(),
            details: e.to_string(),
        }
    }
}
