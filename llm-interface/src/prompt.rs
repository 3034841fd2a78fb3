use subwatch_core::{ConfigError, Post, PROMPT_PLACEHOLDER};

/// Posts longer than this are cut before being embedded in the prompt.
pub const MAX_POST_CHARS: usize = 4000;

pub const DEFAULT_PROMPT: &str = r#"You are a support triage analyst. Decide whether the following Reddit post describes a GENUINE technical issue, service outage, error, payment failure or specific scam report.

Answer YES when the post:
1. Reports a bug, crash, freeze or concrete error message.
2. Describes a specific failed transaction, lost funds or stuck account.
3. Gives specific evidence of fraud.

Answer NO when the post:
1. Is general complaining without technical details.
2. Asks general questions or shares opinions.
3. Is a joke, meme or low-effort post.

Post Content:
"{text}"

Answer ONLY with 'YES' or 'NO'."#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, ConfigError> {
        let template = template.into();
        if !template.contains(PROMPT_PLACEHOLDER) {
            return Err(ConfigError::ValidationFailed {
                reason: format!("prompt must contain the {} placeholder", PROMPT_PLACEHOLDER),
            });
        }
        Ok(Self { template })
    }

    /// Uses the configured template, or the built-in one when none is set.
    pub fn from_config(prompt: Option<&str>) -> Result<Self, ConfigError> {
        match prompt {
            Some(template) => Self::new(template),
            None => Ok(Self::default()),
        }
    }

    pub fn render(&self, post: &Post) -> String {
        let text = post.analysis_text();
        self.template
            .replace(PROMPT_PLACEHOLDER, truncate_chars(&text, MAX_POST_CHARS))
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_PROMPT.to_string(),
        }
    }
}

/// Cuts `text` to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
