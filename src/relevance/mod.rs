//! BM25 relevance ranking and hard-negative mining.
//!
//! Work happens in two phases:
//!
//! 1. **Build** - [`RelevanceIndex::build`] analyzes a fixed corpus once and
//!    returns an immutable index value
//! 2. **Query** - [`RelevanceIndex::search`] ranks documents for a query, and
//!    [`HardNegativeMiner`] turns rankings into negative training texts
//!
//! Because the index is a plain value with no interior mutability, it can be
//! shared across threads (`Arc<RelevanceIndex>` or a borrowed reference in a
//! rayon scope) and queried concurrently.
//!
//! # Usage
//!
//! ```
//! use dataselect::relevance::{Bm25Params, HardNegativeMiner, RelevanceIndex};
//!
//! let index = RelevanceIndex::build(
//!     ["the cat sat on the mat", "the dog sat on the log", "cats and dogs are pets"],
//!     Bm25Params::default(),
//! )
//! .unwrap();
//!
//! let ranked = index.search("cat sat", 3);
//! assert_eq!(ranked.doc_ids().next(), Some(0));
//!
//! let negatives = HardNegativeMiner::select_hard_negatives(&index, "cat sat", 0, 2, 0).unwrap();
//! assert_eq!(negatives.len(), 2);
//! ```

pub mod analyzer;
pub mod index;
pub mod negatives;

pub use analyzer::{default_analyzer, Analyzer, StandardAnalyzer, WhitespaceAnalyzer};
pub use index::{Bm25Params, RelevanceIndex};
pub use negatives::{HardNegativeMiner, MinedExample, NegativeConfig};
