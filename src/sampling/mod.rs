//! Statistically-sized uniform sampling.
//!
//! Two pieces compose here:
//!
//! 1. **Sizing** - [`SampleSizeCalculator`] turns a confidence level, margin of
//!    error and a proportion or standard-deviation estimate into a sample size
//!    using Cochran's formula with finite-population correction.
//! 2. **Sampling** - [`ReservoirSampler`] draws a uniform sample of that size
//!    in a single pass over a record stream.
//!
//! # Usage
//!
//! ```
//! use dataselect::sampling::{ReservoirSampler, SampleSpec};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let corpus: Vec<u32> = (0..10_000).collect();
//! let k = SampleSpec::proportion(0.95, 0.03, 0.5).resolve(corpus.len()).unwrap();
//! assert_eq!(k, 965);
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let sample = ReservoirSampler.sample(corpus, k, &mut rng).unwrap();
//! assert_eq!(sample.achieved, 965);
//! ```

pub mod reservoir;
pub mod size;
pub mod spec;

pub use reservoir::{Reservoir, ReservoirSampler};
pub use size::{sample_size_mean, sample_size_proportion, z_score, Estimator, SampleSizeCalculator};
pub use spec::{SampleMode, SampleSpec};
