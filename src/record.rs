//! Corpus records and selection results.
//!
//! A corpus is an ordered slice of [`Record`]s; a record's position in that
//! slice is its `doc_id` for the lifetime of one call. The engine never
//! mutates records, it only returns clones or indices.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named-field row representing one document or text unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this record with `field` set to `value`.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Returns the raw value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns a field as text, if it is a JSON string.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Returns the field names of this record.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The chosen subset from a sampling or coreset call.
///
/// `achieved` may be smaller than `requested` when the corpus holds fewer
/// eligible items than were asked for. That is a valid outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult<T> {
    /// Selected items (records or indices).
    pub items: Vec<T>,

    /// Size the caller asked for after size resolution.
    pub requested: usize,

    /// Size actually produced.
    pub achieved: usize,
}

impl<T> SelectionResult<T> {
    /// Wraps selected items together with the requested size.
    pub fn new(items: Vec<T>, requested: usize) -> Self {
        let achieved = items.len();
        Self {
            items,
            requested,
            achieved,
        }
    }

    /// Returns true when fewer items were produced than requested.
    pub fn is_underfilled(&self) -> bool {
        self.achieved < self.requested
    }

    /// Maps the selected items, keeping the size bookkeeping.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> SelectionResult<U> {
        SelectionResult {
            items: self.items.into_iter().map(f).collect(),
            requested: self.requested,
            achieved: self.achieved,
        }
    }
}

/// One scored document in a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub doc_id: usize,
    pub score: f64,
}

/// A ranking over corpus documents, sorted by descending score.
///
/// Equal scores keep ascending `doc_id` order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedResult {
    hits: Vec<ScoredDoc>,
}

impl RankedResult {
    /// Builds a ranking from unordered `(doc_id, score)` pairs.
    pub fn from_scores(scores: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut hits: Vec<ScoredDoc> = scores
            .into_iter()
            .map(|(doc_id, score)| ScoredDoc { doc_id, score })
            .collect();
        hits.sort_by(|a, b| {
            OrderedFloat(b.score)
                .cmp(&OrderedFloat(a.score))
                .then(a.doc_id.cmp(&b.doc_id))
        });
        Self { hits }
    }

    /// Keeps only the first `top_k` hits.
    pub fn truncate(mut self, top_k: usize) -> Self {
        self.hits.truncate(top_k);
        self
    }

    /// Hits in rank order.
    pub fn hits(&self) -> &[ScoredDoc] {
        &self.hits
    }

    /// Document ids in rank order.
    pub fn doc_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.hits.iter().map(|h| h.doc_id)
    }

    /// Score of a document, if it is part of this ranking.
    pub fn score_of(&self, doc_id: usize) -> Option<f64> {
        self.hits.iter().find(|h| h.doc_id == doc_id).map(|h| h.score)
    }

    /// Returns the ranking as an unordered `doc_id -> score` map.
    pub fn to_map(&self) -> HashMap<usize, f64> {
        self.hits.iter().map(|h| (h.doc_id, h.score)).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_text_fields() {
        let record = Record::new()
            .with("query", "what is bm25")
            .with("score", 3);

        assert_eq!(record.text("query"), Some("what is bm25"));
        assert_eq!(record.text("score"), None, "non-string field is not text");
        assert_eq!(record.text("missing"), None);
        assert_eq!(record.fields().count(), 2);
    }

    #[test]
    fn test_record_serde_is_transparent() {
        let record: Record =
            serde_json::from_str(r#"{"text": "hello", "id": 7}"#).expect("valid json");
        assert_eq!(record.text("text"), Some("hello"));

        let json = serde_json::to_string(&record).expect("serializable");
        assert!(json.starts_with('{'));
        assert!(json.contains("\"text\":\"hello\""));
    }

    #[test]
    fn test_selection_result_underfill() {
        let full = SelectionResult::new(vec![1, 2, 3], 3);
        assert!(!full.is_underfilled());

        let short = SelectionResult::new(vec![1, 2], 5);
        assert!(short.is_underfilled());
        assert_eq!(short.achieved, 2);
        assert_eq!(short.requested, 5);

        let mapped = short.map(|x| x * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.requested, 5);
    }

    #[test]
    fn test_ranked_result_ordering_and_ties() {
        let ranked = RankedResult::from_scores(vec![(3, 1.0), (0, 2.5), (2, 1.0), (1, 0.0)]);
        let ids: Vec<usize> = ranked.doc_ids().collect();
        assert_eq!(ids, vec![0, 2, 3, 1], "ties keep ascending doc_id order");

        let top = ranked.clone().truncate(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top.score_of(0), Some(2.5));
        assert_eq!(top.score_of(3), None);

        let map = ranked.to_map();
        assert_eq!(map.len(), 4);
        assert_eq!(map[&1], 0.0);
    }
}
