use crate::types::Post;

/// Case-insensitive substring matcher over a post's title and body.
///
/// Keywords are tried in configured order and the first hit wins, so a post
/// mentioning several keywords is always attributed to the earliest one.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    keywords: Vec<(String, String)>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .map(|k| {
                let lowered = k.to_lowercase();
                (k, lowered)
            })
            .collect();

        Self { keywords }
    }

    pub fn find_match(&self, post: &Post) -> Option<&str> {
        let haystack = post.searchable_text().to_lowercase();
        self.keywords
            .iter()
            .find(|(_, lowered)| haystack.contains(lowered.as_str()))
            .map(|(original, _)| original.as_str())
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
