//! Text analysis for relevance scoring.
//!
//! An [`Analyzer`] turns raw text into index terms. The index and every query
//! must go through the same analyzer, so the index keeps the one it was built
//! with.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

/// Converts text into a sequence of index terms.
pub trait Analyzer: Send + Sync + Debug {
    /// Returns the terms of `text` in order, duplicates included.
    fn analyze(&self, text: &str) -> Vec<String>;
}

/// English stopwords removed by [`StandardAnalyzer`].
const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

struct StandardResources {
    word: Regex,
    stemmer: Stemmer,
    stopwords: HashSet<&'static str>,
}

fn standard_resources() -> &'static StandardResources {
    static RESOURCES: OnceLock<StandardResources> = OnceLock::new();
    RESOURCES.get_or_init(|| StandardResources {
        word: Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid word regex"),
        stemmer: Stemmer::create(Algorithm::English),
        stopwords: ENGLISH_STOPWORDS.iter().copied().collect(),
    })
}

/// NFKC normalization, lowercasing, word extraction, stopword removal and
/// English stemming.
#[derive(Debug, Clone, Copy)]
pub struct StandardAnalyzer {
    remove_stopwords: bool,
    stem: bool,
}

impl Default for StandardAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardAnalyzer {
    pub fn new() -> Self {
        Self {
            remove_stopwords: true,
            stem: true,
        }
    }

    /// Keeps stopwords in the term stream.
    pub fn keep_stopwords(mut self) -> Self {
        self.remove_stopwords = false;
        self
    }

    /// Disables stemming.
    pub fn without_stemming(mut self) -> Self {
        self.stem = false;
        self
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Vec<String> {
        let resources = standard_resources();
        let normalized = text.nfkc().collect::<String>().to_lowercase();

        resources
            .word
            .find_iter(&normalized)
            .map(|m| m.as_str())
            .filter(|token| !(self.remove_stopwords && resources.stopwords.contains(*token)))
            .map(|token| {
                if self.stem {
                    resources.stemmer.stem(token).into_owned()
                } else {
                    token.to_string()
                }
            })
            .collect()
    }
}

/// Lowercased whitespace tokens, nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceAnalyzer;

impl Analyzer for WhitespaceAnalyzer {
    fn analyze(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_lowercase).collect()
    }
}

/// Shared default analyzer, constructed on first use.
pub fn default_analyzer() -> Arc<dyn Analyzer> {
    static DEFAULT: OnceLock<Arc<dyn Analyzer>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| Arc::new(StandardAnalyzer::new()))
        .clone()
}
