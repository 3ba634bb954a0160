//! Immutable BM25 relevance index.
//!
//! `build` analyzes every document once and publishes a finished
//! [`RelevanceIndex`]; there is no insertion or removal afterwards. A built
//! index is `Send + Sync` and serves concurrent queries without locking.
//!
//! Scoring:
//!
//! ```text
//! score(q, d) = Σ_{t ∈ q} IDF(t) · tf(t,d)·(k1+1) / (tf(t,d) + k1·(1 − b + b·|d|/avgdl))
//! IDF(t)      = ln(1 + (N − df(t) + 0.5) / (df(t) + 0.5))
//! ```
//!
//! Length normalization applies to documents only. Query terms are summed
//! as they occur, so a term repeated in the query counts once per occurrence.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::analyzer::{default_analyzer, Analyzer};
use crate::error::{Result, SelectionError};
use crate::record::RankedResult;

/// Default term-frequency saturation.
pub const DEFAULT_K1: f64 = 0.9;

/// Default document-length normalization strength.
pub const DEFAULT_B: f64 = 0.4;

/// Tunable BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
        }
    }
}

impl Bm25Params {
    pub fn new(k1: f64, b: f64) -> Self {
        Self { k1, b }
    }

    /// Checks `k1 >= 0` and `0 <= b <= 1`.
    pub fn validate(&self) -> Result<()> {
        if !(self.k1.is_finite() && self.k1 >= 0.0) {
            return Err(SelectionError::invalid(format!(
                "bm25 k1 must be non-negative, got {}",
                self.k1
            )));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(SelectionError::invalid(format!(
                "bm25 b must be in [0, 1], got {}",
                self.b
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc_id: usize,
    tf: u32,
}

/// A built, read-only BM25 index over a fixed corpus.
pub struct RelevanceIndex {
    params: Bm25Params,
    analyzer: Arc<dyn Analyzer>,
    documents: Vec<String>,
    doc_lengths: Vec<u32>,
    avgdl: f64,
    postings: HashMap<String, Vec<Posting>>,
}

impl fmt::Debug for RelevanceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelevanceIndex")
            .field("params", &self.params)
            .field("analyzer", &self.analyzer)
            .field("documents", &self.documents.len())
            .field("vocabulary", &self.postings.len())
            .field("avgdl", &self.avgdl)
            .finish()
    }
}

impl RelevanceIndex {
    /// Builds an index with the default analyzer.
    ///
    /// # Errors
    ///
    /// - `EmptyCorpus` if `documents` is empty.
    /// - `InvalidArgument` if `params` are out of range.
    pub fn build<I, S>(documents: I, params: Bm25Params) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build_with(documents, params, default_analyzer())
    }

    /// Builds an index with a caller-chosen analyzer.
    pub fn build_with<I, S>(
        documents: I,
        params: Bm25Params,
        analyzer: Arc<dyn Analyzer>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        params.validate()?;
        let documents: Vec<String> = documents.into_iter().map(Into::into).collect();
        if documents.is_empty() {
            return Err(SelectionError::empty("RelevanceIndex"));
        }

        let mut doc_lengths = Vec::with_capacity(documents.len());
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();

        for (doc_id, text) in documents.iter().enumerate() {
            let terms = analyzer.analyze(text);
            doc_lengths.push(terms.len() as u32);

            let mut frequencies: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *frequencies.entry(term).or_insert(0) += 1;
            }
            for (term, tf) in frequencies {
                postings.entry(term).or_default().push(Posting { doc_id, tf });
            }
        }

        let total_terms: u64 = doc_lengths.iter().map(|&l| u64::from(l)).sum();
        let avgdl = total_terms as f64 / documents.len() as f64;

        info!(
            documents = documents.len(),
            vocabulary = postings.len(),
            avgdl,
            k1 = params.k1,
            b = params.b,
            "built relevance index"
        );

        Ok(Self {
            params,
            analyzer,
            documents,
            doc_lengths,
            avgdl,
            postings,
        })
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Text of a document by id.
    pub fn document(&self, doc_id: usize) -> Option<&str> {
        self.documents.get(doc_id).map(String::as_str)
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Average analyzed document length.
    pub fn avgdl(&self) -> f64 {
        self.avgdl
    }

    /// Number of distinct terms.
    pub fn vocabulary_size(&self) -> usize {
        self.postings.len()
    }

    /// Inverse document frequency of an analyzed term (0 if unseen).
    pub fn idf(&self, term: &str) -> f64 {
        self.postings
            .get(term)
            .map(|postings| self.idf_for_df(postings.len()))
            .unwrap_or(0.0)
    }

    fn idf_for_df(&self, df: usize) -> f64 {
        let n = self.documents.len() as f64;
        let df = df as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Scores every document against `query`, indexed by `doc_id`.
    pub fn score_all(&self, query: &str) -> Vec<f64> {
        let Bm25Params { k1, b } = self.params;
        let mut scores = vec![0.0; self.documents.len()];

        for term in self.analyzer.analyze(query) {
            let Some(postings) = self.postings.get(&term) else {
                continue;
            };
            let idf = self.idf_for_df(postings.len());
            for posting in postings {
                let tf = f64::from(posting.tf);
                let length = f64::from(self.doc_lengths[posting.doc_id]);
                let norm = k1 * (1.0 - b + b * length / self.avgdl);
                scores[posting.doc_id] += idf * tf * (k1 + 1.0) / (tf + norm);
            }
        }

        scores
    }

    /// Every document ranked by descending score, ties by ascending `doc_id`.
    pub fn rank_all(&self, query: &str) -> RankedResult {
        RankedResult::from_scores(self.score_all(query).into_iter().enumerate())
    }

    /// The `top_k` best documents for `query`.
    pub fn search(&self, query: &str, top_k: usize) -> RankedResult {
        self.rank_all(query).truncate(top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relevance::analyzer::WhitespaceAnalyzer;

    fn toy_index() -> RelevanceIndex {
        RelevanceIndex::build(
            [
                "the cat sat on the mat",
                "the dog sat on the log",
                "cats and dogs are pets",
            ],
            Bm25Params::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_build_statistics() {
        let index = toy_index();
        assert_eq!(index.len(), 3);
        assert!((index.avgdl() - 3.0).abs() < 1e-12);
        assert_eq!(index.document(1), Some("the dog sat on the log"));
        assert_eq!(index.document(3), None);
        assert!(index.vocabulary_size() >= 6);
    }

    #[test]
    fn test_build_empty_corpus() {
        let err = RelevanceIndex::build(Vec::<String>::new(), Bm25Params::default()).unwrap_err();
        assert!(matches!(err, SelectionError::EmptyCorpus { .. }));
    }

    #[test]
    fn test_build_rejects_bad_params() {
        assert!(RelevanceIndex::build(["x"], Bm25Params::new(-1.0, 0.4)).is_err());
        assert!(RelevanceIndex::build(["x"], Bm25Params::new(0.9, 1.5)).is_err());
    }

    #[test]
    fn test_search_ranks_best_match_first() {
        let index = toy_index();
        let ranked = index.search("cat sat", 3);
        let ids: Vec<usize> = ranked.doc_ids().collect();

        assert_eq!(ids[0], 0);
        let top = ranked.score_of(0).unwrap();
        assert!(top > ranked.score_of(1).unwrap());
        assert!(top > ranked.score_of(2).unwrap());
    }

    #[test]
    fn test_search_truncates_and_breaks_ties_by_doc_id() {
        let index = toy_index();
        let ranked = index.search("unrelated words", 2);
        assert_eq!(ranked.doc_ids().collect::<Vec<_>>(), vec![0, 1]);
        assert!(ranked.hits().iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_idf_is_positive_and_rarer_terms_weigh_more() {
        let index = toy_index();
        let common = index.idf("sat");
        let rare = index.idf("mat");
        assert!(common > 0.0);
        assert!(rare > common);
        assert_eq!(index.idf("zebra"), 0.0);
    }

    #[test]
    fn test_query_term_repetition_is_not_normalized() {
        let index = RelevanceIndex::build_with(
            ["apple banana", "banana cherry", "cherry date"],
            Bm25Params::default(),
            Arc::new(WhitespaceAnalyzer),
        )
        .unwrap();
        let once = index.score_all("apple")[0];
        let twice = index.score_all("apple apple")[0];
        assert!((twice - 2.0 * once).abs() < 1e-12);
    }

    #[test]
    fn test_longer_documents_are_penalized() {
        let index = RelevanceIndex::build_with(
            ["rust", "rust filler filler filler filler", "other"],
            Bm25Params::default(),
            Arc::new(WhitespaceAnalyzer),
        )
        .unwrap();
        let scores = index.score_all("rust");
        assert!(scores[0] > scores[1]);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_search_is_idempotent() {
        let index = toy_index();
        assert_eq!(index.search("dog log", 3), index.search("dog log", 3));
    }

    #[test]
    fn test_index_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RelevanceIndex>();
    }
}
