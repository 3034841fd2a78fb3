use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// A single post pulled from a subreddit feed.
///
/// `id` is the dedupe key: the entry's link when the feed provides one,
/// otherwise the entry id / GUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub body: String,
    pub link: String,
}

impl Post {
    /// Text the keyword filter scans.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }

    /// Text handed to the classifier.
    pub fn analysis_text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n{}", self.title, self.body)
        }
    }
}

/// A keyword-matched post waiting for classification.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub post: Post,
    pub keyword: String,
    pub enqueued_at: SystemTime,
}

impl QueueItem {
    pub fn new(post: Post, keyword: impl Into<String>) -> Self {
        Self {
            post,
            keyword: keyword.into(),
            enqueued_at: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Relevant,
    NotRelevant,
}

/// Returned when the model answers with something other than YES or NO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedVerdict {
    pub raw: String,
}

impl fmt::Display for UnrecognizedVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized verdict: {:?}", self.raw)
    }
}

impl std::error::Error for UnrecognizedVerdict {}

impl Verdict {
    /// Parses a strict YES/NO answer. Surrounding whitespace, quotes, markdown
    /// emphasis and trailing punctuation are ignored; case is not significant.
    pub fn parse(answer: &str) -> Result<Self, UnrecognizedVerdict> {
        let normalized = answer
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
            .trim_end_matches(|c: char| c == '.' || c == '!')
            .trim()
            .to_ascii_uppercase();

        match normalized.as_str() {
            "YES" => Ok(Verdict::Relevant),
            "NO" => Ok(Verdict::NotRelevant),
            _ => Err(UnrecognizedVerdict {
                raw: answer.to_string(),
            }),
        }
    }

    pub fn is_relevant(self) -> bool {
        matches!(self, Verdict::Relevant)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Relevant => write!(f, "relevant"),
            Verdict::NotRelevant => write!(f, "not relevant"),
        }
    }
}
