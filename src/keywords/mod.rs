//! Keyword extraction
//!
//! Turns free text into normalized keyword tokens:
//! - Unicode word segmentation
//! - Lowercasing
//! - Digit removal
//! - English stopword removal
//!
//! Ingestion keeps duplicate tokens to count frequencies; queries collapse them.

mod stopwords;

use std::collections::{BTreeMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Normalizes text into keyword tokens
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    stopwords: HashSet<&'static str>,
    min_len: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(crate::config::default_min_keyword_len())
    }
}

impl KeywordExtractor {
    pub fn new(min_len: usize) -> Self {
        Self {
            stopwords: stopwords::ENGLISH.iter().copied().collect(),
            min_len: min_len.max(1),
        }
    }

    /// Extract keywords in text order, duplicates retained
    pub fn extract(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .filter_map(|word| self.normalize(word))
            .collect()
    }

    /// Extract keywords in first-occurrence order, duplicates removed
    pub fn extract_unique(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.extract(text)
            .into_iter()
            .filter(|kw| seen.insert(kw.clone()))
            .collect()
    }

    fn normalize(&self, word: &str) -> Option<String> {
        let token: String = word
            .chars()
            .filter(|c| !c.is_numeric())
            .flat_map(char::to_lowercase)
            .collect();
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());

        if token.chars().count() < self.min_len || self.stopwords.contains(token) {
            return None;
        }
        Some(token.to_string())
    }
}

/// Count occurrences of each keyword
pub fn keyword_counts<I, S>(tokens: I) -> BTreeMap<String, u32>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut counts = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.into()).or_insert(0) += 1;
    }
    counts
}
