use async_trait::async_trait;
use subwatch_core::{ClassificationError, Post, Verdict};

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiProvider;
pub use prompt::{PromptTemplate, DEFAULT_PROMPT, MAX_POST_CHARS};


/// A model that can judge whether a keyword-matched post is worth an alert.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    async fn classify(&self, post: &Post) -> Result<Verdict, ClassificationError>;
}
