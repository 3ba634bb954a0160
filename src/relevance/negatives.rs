//! Hard-negative mining on top of a built [`RelevanceIndex`].
//!
//! A hard negative is a document that scores well for a query but is not its
//! gold answer. Negatives are taken from the ranking after skipping the first
//! `start_rank` entries, which lets callers avoid the very top of the list
//! where unlabeled true positives tend to sit.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::analyzer::{default_analyzer, Analyzer};
use super::index::{Bm25Params, RelevanceIndex};
use crate::error::{Result, SelectionError};
use crate::record::Record;

/// Default number of negatives per query.
pub const DEFAULT_NUM_NEG: usize = 7;

/// Default number of top-ranked entries skipped before collecting negatives.
pub const DEFAULT_START_RANK: usize = 3;

/// Negative-selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegativeConfig {
    pub num_neg: usize,
    pub start_rank: usize,
}

impl Default for NegativeConfig {
    fn default() -> Self {
        Self {
            num_neg: DEFAULT_NUM_NEG,
            start_rank: DEFAULT_START_RANK,
        }
    }
}

/// One training example produced by [`HardNegativeMiner::mine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinedExample {
    pub query: String,
    pub positive: String,
    pub negatives: Vec<String>,
}

/// Picks hard negatives for queries against a relevance index.
#[derive(Debug, Clone)]
pub struct HardNegativeMiner {
    params: Bm25Params,
    policy: NegativeConfig,
    analyzer: Arc<dyn Analyzer>,
}

impl Default for HardNegativeMiner {
    fn default() -> Self {
        Self::new(Bm25Params::default(), NegativeConfig::default())
    }
}

impl HardNegativeMiner {
    pub fn new(params: Bm25Params, policy: NegativeConfig) -> Self {
        Self {
            params,
            policy,
            analyzer: default_analyzer(),
        }
    }

    /// Uses `analyzer` for indexes built by [`mine`](Self::mine).
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn policy(&self) -> NegativeConfig {
        self.policy
    }

    /// Returns up to `num_neg` negative texts for `query`.
    ///
    /// Documents are ranked by descending score, the first `start_rank`
    /// ranked entries are skipped, and the rest are scanned in rank order.
    /// The gold document and any document with exactly the gold text are
    /// never returned. Running out of documents yields a shorter list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `gold_id` is not a document of `index`.
    pub fn select_hard_negatives(
        index: &RelevanceIndex,
        query: &str,
        gold_id: usize,
        num_neg: usize,
        start_rank: usize,
    ) -> Result<Vec<String>> {
        let Some(gold_text) = index.document(gold_id) else {
            return Err(SelectionError::invalid(format!(
                "gold_id {gold_id} is not in the corpus of {} documents",
                index.len()
            )));
        };

        let negatives: Vec<String> = index
            .rank_all(query)
            .doc_ids()
            .skip(start_rank)
            .filter(|&doc_id| doc_id != gold_id)
            .filter_map(|doc_id| index.document(doc_id))
            .filter(|&text| text != gold_text)
            .take(num_neg)
            .map(str::to_string)
            .collect();

        Ok(negatives)
    }

    /// Applies this miner's policy to one query.
    pub fn negatives_for(
        &self,
        index: &RelevanceIndex,
        query: &str,
        gold_id: usize,
    ) -> Result<Vec<String>> {
        Self::select_hard_negatives(
            index,
            query,
            gold_id,
            self.policy.num_neg,
            self.policy.start_rank,
        )
    }

    /// Mines hard negatives for every record of a query/positive corpus.
    ///
    /// The positives of all records form the candidate pool: one index is
    /// built over them, and each record's own positive is its gold document.
    /// Queries run in parallel against the shared, immutable index.
    ///
    /// # Errors
    ///
    /// - `EmptyCorpus` if `records` is empty.
    /// - `InvalidArgument` if a record lacks either text field.
    pub fn mine(
        &self,
        records: &[Record],
        query_field: &str,
        positive_field: &str,
    ) -> Result<Vec<MinedExample>> {
        if records.is_empty() {
            return Err(SelectionError::empty("HardNegativeMiner"));
        }

        let queries = field_texts(records, query_field)?;
        let positives = field_texts(records, positive_field)?;
        let index = RelevanceIndex::build_with(
            positives.iter().copied(),
            self.params,
            Arc::clone(&self.analyzer),
        )?;

        let examples = queries
            .par_iter()
            .enumerate()
            .map(|(gold_id, &query)| {
                let negatives = self.negatives_for(&index, query, gold_id)?;
                Ok(MinedExample {
                    query: query.to_string(),
                    positive: positives[gold_id].to_string(),
                    negatives,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let underfilled = examples
            .iter()
            .filter(|e| e.negatives.len() < self.policy.num_neg)
            .count();
        if underfilled > 0 {
            warn!(
                underfilled,
                requested = self.policy.num_neg,
                "some queries received fewer hard negatives than requested"
            );
        }
        info!(
            examples = examples.len(),
            num_neg = self.policy.num_neg,
            start_rank = self.policy.start_rank,
            "mined hard negatives"
        );

        Ok(examples)
    }
}

/// Extracts a required text field from every record.
fn field_texts<'a>(records: &'a [Record], field: &str) -> Result<Vec<&'a str>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            record.text(field).ok_or_else(|| {
                SelectionError::invalid(format!("record {i} has no text field '{field}'"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> RelevanceIndex {
        RelevanceIndex::build(
            [
                "rust borrow checker explained",
                "borrow checker errors in rust",
                "python garbage collection",
                "rust lifetimes and the borrow checker",
                "cooking pasta at home",
            ],
            Bm25Params::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_negatives_exclude_gold() {
        let index = corpus();
        for gold_id in 0..index.len() {
            let negatives =
                HardNegativeMiner::select_hard_negatives(&index, "rust borrow checker", gold_id, 10, 0)
                    .unwrap();
            let gold = index.document(gold_id).unwrap();
            assert!(!negatives.iter().any(|n| n == gold), "gold {gold_id} leaked");
            assert_eq!(negatives.len(), 4, "all non-gold documents are available");
        }
    }

    #[test]
    fn test_negatives_follow_rank_order() {
        let index = corpus();
        let ranked: Vec<usize> = index.rank_all("rust borrow checker").doc_ids().collect();
        let gold_id = ranked[0];

        let negatives =
            HardNegativeMiner::select_hard_negatives(&index, "rust borrow checker", gold_id, 2, 0)
                .unwrap();
        let expected: Vec<String> = ranked[1..3]
            .iter()
            .map(|&id| index.document(id).unwrap().to_string())
            .collect();
        assert_eq!(negatives, expected);
    }

    #[test]
    fn test_start_rank_skips_top_entries() {
        let index = corpus();
        let ranked: Vec<usize> = index.rank_all("rust borrow checker").doc_ids().collect();
        let gold_id = ranked[4];

        let negatives =
            HardNegativeMiner::select_hard_negatives(&index, "rust borrow checker", gold_id, 5, 2)
                .unwrap();
        let expected: Vec<String> = ranked[2..4]
            .iter()
            .map(|&id| index.document(id).unwrap().to_string())
            .collect();
        assert_eq!(negatives, expected, "two skipped, gold excluded");
    }

    #[test]
    fn test_unknown_gold_id() {
        let index = corpus();
        let err = HardNegativeMiner::select_hard_negatives(&index, "rust", 99, 3, 0).unwrap_err();
        assert!(matches!(err, SelectionError::InvalidArgument(_)));
    }

    #[test]
    fn test_duplicate_of_gold_text_is_excluded() {
        let index =
            RelevanceIndex::build(["same text", "same text", "other text"], Bm25Params::default())
                .unwrap();
        let negatives =
            HardNegativeMiner::select_hard_negatives(&index, "same", 0, 5, 0).unwrap();
        assert_eq!(negatives, vec!["other text".to_string()]);
    }

    #[test]
    fn test_mine_records() {
        let records = vec![
            Record::new()
                .with("query", "how does the borrow checker work")
                .with("answer", "rust borrow checker explained"),
            Record::new()
                .with("query", "python memory management")
                .with("answer", "python garbage collection"),
            Record::new()
                .with("query", "lifetimes in rust")
                .with("answer", "rust lifetimes and the borrow checker"),
        ];
        let miner = HardNegativeMiner::new(
            Bm25Params::default(),
            NegativeConfig {
                num_neg: 1,
                start_rank: 0,
            },
        );
        let examples = miner.mine(&records, "query", "answer").unwrap();

        assert_eq!(examples.len(), 3);
        for (record, example) in records.iter().zip(&examples) {
            assert_eq!(record.text("answer"), Some(example.positive.as_str()));
            assert_eq!(example.negatives.len(), 1);
            assert_ne!(example.negatives[0], example.positive);
        }
        assert_eq!(
            examples[0].negatives[0], "rust lifetimes and the borrow checker",
            "closest non-gold answer comes first"
        );
    }

    #[test]
    fn test_mine_missing_field() {
        let records = vec![Record::new().with("query", "q")];
        let err = HardNegativeMiner::default()
            .mine(&records, "query", "answer")
            .unwrap_err();
        assert!(matches!(err, SelectionError::InvalidArgument(_)));
    }

    #[test]
    fn test_mine_empty() {
        let err = HardNegativeMiner::default()
            .mine(&[], "query", "answer")
            .unwrap_err();
        assert!(matches!(err, SelectionError::EmptyCorpus { .. }));
    }
}
