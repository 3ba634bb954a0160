//! Single entry point over the three selection strategies.
//!
//! - sampling: `manual | proportion | mean` through [`SampleSpec`]
//! - subset choice: `random | diversity` through [`SubsetStrategy`]
//! - negative mining: `relevance` through [`HardNegativeMiner`]
//!
//! Every random draw gets its own generator, derived from the configured seed
//! and an operation label. Calls never share RNG state, and the same
//! configuration reproduces the same selection.

use ndarray::ArrayView2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::config::{ConfigError, SelectorConfig};
use crate::diversity::CoresetSelector;
use crate::error::{Result, SelectionError};
use crate::record::{Record, SelectionResult};
use crate::relevance::{HardNegativeMiner, MinedExample, RelevanceIndex};
use crate::sampling::{ReservoirSampler, SampleSpec};

/// How a fixed-ratio subset is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SubsetStrategy {
    /// Uniform random subset.
    Random,
    /// Greedy k-center coreset over embeddings.
    Diversity,
}

/// Facade composing sampling, coreset selection and negative mining.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    config: SelectorConfig,
}

impl Selector {
    /// Creates a selector after validating `config`.
    pub fn new(config: SelectorConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Samples records with the configured default [`SampleSpec`].
    pub fn sample(&self, records: &[Record]) -> Result<SelectionResult<Record>> {
        self.sample_records(records, &self.config.sampling)
    }

    /// Samples records according to `spec`.
    ///
    /// Statistical modes size the sample from `records.len()`. The reservoir
    /// holds references; only the kept records are cloned.
    pub fn sample_records(
        &self,
        records: &[Record],
        spec: &SampleSpec,
    ) -> Result<SelectionResult<Record>> {
        let sampled = self.sample_stream(records.iter(), spec, Some(records.len()))?;
        Ok(sampled.map(Record::clone))
    }

    /// Samples an arbitrary stream according to `spec`.
    ///
    /// `population` must be known for the proportion and mean modes; it is
    /// ignored in manual mode.
    pub fn sample_stream<T, I>(
        &self,
        stream: I,
        spec: &SampleSpec,
        population: Option<usize>,
    ) -> Result<SelectionResult<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let k = match population {
            Some(n) => spec.resolve(n)?,
            None if spec.needs_population() => {
                return Err(SelectionError::invalid(
                    "proportion and mean modes need the corpus size before sampling",
                ))
            }
            None => spec.resolve(0)?,
        };

        info!(mode = ?spec.mode, k, population, "sampling records");
        let mut rng = self.rng_for("reservoir");
        ReservoirSampler.sample(stream, k, &mut rng)
    }

    /// Chooses `⌊N · ratio⌋` records with the given strategy.
    ///
    /// `embeddings` must have one row per record for the diversity strategy
    /// and is ignored by the random strategy.
    pub fn select_subset(
        &self,
        records: &[Record],
        embeddings: Option<ArrayView2<'_, f32>>,
        ratio: f64,
        strategy: SubsetStrategy,
    ) -> Result<SelectionResult<Record>> {
        let indices = self.select_subset_indices(records.len(), embeddings, ratio, strategy)?;
        Ok(indices.map(|i| records[i].clone()))
    }

    /// Index-only variant of [`select_subset`](Self::select_subset).
    pub fn select_subset_indices(
        &self,
        population: usize,
        embeddings: Option<ArrayView2<'_, f32>>,
        ratio: f64,
        strategy: SubsetStrategy,
    ) -> Result<SelectionResult<usize>> {
        if population == 0 {
            return Err(SelectionError::empty("Selector"));
        }
        if !(ratio.is_finite() && ratio > 0.0 && ratio <= 1.0) {
            return Err(SelectionError::invalid(format!(
                "ratio must be in (0, 1], got {ratio}"
            )));
        }

        info!(population, ratio, ?strategy, "selecting subset");
        match strategy {
            SubsetStrategy::Random => {
                let k = (population as f64 * ratio).floor() as usize;
                if k == 0 {
                    return Ok(SelectionResult::new(Vec::new(), 0));
                }
                let mut rng = self.rng_for("random-subset");
                let mut result = ReservoirSampler.sample_indices(population, k, &mut rng)?;
                result.items.sort_unstable();
                Ok(result)
            }
            SubsetStrategy::Diversity => {
                let vectors = embeddings.ok_or_else(|| {
                    SelectionError::invalid("diversity selection requires embeddings")
                })?;
                if vectors.nrows() != population {
                    return Err(SelectionError::invalid(format!(
                        "{} embeddings for {population} records",
                        vectors.nrows()
                    )));
                }
                let mut rng = self.rng_for("coreset");
                self.coreset_selector().select(vectors, ratio, &mut rng)
            }
        }
    }

    /// Builds a relevance index over `documents` with the configured BM25 parameters.
    pub fn build_index<I, S>(&self, documents: I) -> Result<RelevanceIndex>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RelevanceIndex::build(documents, self.config.bm25)
    }

    /// Mines hard negatives for a query/positive record corpus.
    pub fn mine_negatives(
        &self,
        records: &[Record],
        query_field: &str,
        positive_field: &str,
    ) -> Result<Vec<MinedExample>> {
        self.miner().mine(records, query_field, positive_field)
    }

    /// Hard-negative miner using the configured BM25 parameters and policy.
    pub fn miner(&self) -> HardNegativeMiner {
        HardNegativeMiner::new(self.config.bm25, self.config.negatives)
    }

    /// Coreset selector using the configured tuning knobs.
    pub fn coreset_selector(&self) -> CoresetSelector {
        CoresetSelector::new()
            .with_parallel_threshold(self.config.coreset.parallel_threshold)
            .with_progress_interval(self.config.coreset.progress_interval)
    }

    /// Creates the random number generator for one operation.
    fn rng_for(&self, operation: &str) -> ChaCha8Rng {
        match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(derive_seed(seed, operation)),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }
}

/// Mixes a base seed with an operation label.
fn derive_seed(seed: u64, operation: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(operation.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
