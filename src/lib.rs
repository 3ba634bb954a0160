//! dataselect: decides which records of a text/embedding corpus to keep for
//! training-data curation.
//!
//! Three strategies are provided, composable through [`Selector`]:
//! - statistically-sized reservoir sampling ([`sampling`])
//! - greedy farthest-point coreset selection over embeddings ([`diversity`])
//! - BM25 ranking and hard-negative mining ([`relevance`])
//!
//! Records and embeddings are owned by the caller. The engine only holds
//! per-call working state and never mutates its inputs.

// Core modules
pub mod cli;
pub mod config;
pub mod diversity;
pub mod error;
pub mod record;
pub mod relevance;
pub mod sampling;
pub mod selector;

// Re-export commonly used types
pub use config::{ConfigError, SelectorConfig};
pub use error::{Result, SelectionError};
pub use record::{RankedResult, Record, ScoredDoc, SelectionResult};
pub use selector::{Selector, SubsetStrategy};
