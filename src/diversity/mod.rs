//! Diversity-driven subset selection over embedding vectors.
//!
//! When curating training data, a uniform sample keeps the corpus's
//! redundancy: dense regions of near-identical records dominate. A coreset
//! instead picks records that cover the embedding space, so rare regions are
//! represented and duplicates are skipped.
//!
//! This module provides two components:
//!
//! 1. **Distance** - embedding matrix validation and the batched min-distance
//!    update shared by the selection loop
//! 2. **Coreset** - greedy farthest-point ("k-center greedy") selection
//!
//! Embeddings are never computed here. Callers pass a precomputed
//! `N × D` matrix whose rows line up with corpus records by index.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dataselect::diversity::{embedding_matrix, CoresetSelector};
//!
//! let vectors = embedding_matrix(&embeddings)?;
//! let coreset = CoresetSelector::new().select(vectors.view(), 0.1, &mut rng)?;
//! println!("Kept {} of {} records", coreset.achieved, vectors.nrows());
//! ```

pub mod coreset;
pub mod distance;

pub use coreset::CoresetSelector;
pub use distance::{embedding_matrix, euclidean_distance, validate_embeddings, EmbeddingMatrix};
