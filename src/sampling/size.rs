//! Closed-form sample sizes (Cochran's formula with finite-population correction).
//!
//! Proportion form: `n0 = Z² · p · (1 − p) / e²`
//! Mean form:       `n0 = Z² · σ² / e²`
//! Both forms:      `k  = ceil(n0 / (1 + (n0 − 1) / N))`

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SelectionError};

/// Supported confidence levels and their two-sided Z-scores.
const Z_TABLE: [(f64, f64); 3] = [(0.90, 1.645), (0.95, 1.96), (0.99, 2.576)];

/// Tolerance when matching a confidence level against the table.
const CONF_LEVEL_TOLERANCE: f64 = 1e-9;

/// The population parameter estimate driving the sample size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    /// Expected proportion `p`, strictly between 0 and 1.
    Proportion(f64),

    /// Expected standard deviation `sigma`, strictly positive.
    Mean(f64),
}

/// Looks up the Z-score for a confidence level.
///
/// Only 0.90, 0.95 and 0.99 are supported.
pub fn z_score(conf_level: f64) -> Result<f64> {
    Z_TABLE
        .iter()
        .find(|(level, _)| (level - conf_level).abs() < CONF_LEVEL_TOLERANCE)
        .map(|(_, z)| *z)
        .ok_or_else(|| {
            SelectionError::invalid(format!(
                "unsupported confidence level {conf_level}; expected one of 0.90, 0.95, 0.99"
            ))
        })
}

/// Stateless calculator for statistically-sized samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleSizeCalculator;

impl SampleSizeCalculator {
    /// Computes the sample size `k` for a population of `population` records.
    ///
    /// # Errors
    ///
    /// - `EmptyCorpus` if `population` is 0.
    /// - `InvalidArgument` for an unsupported confidence level, a non-positive
    ///   margin, `p` outside `(0, 1)` or a non-positive `sigma`.
    pub fn size(
        &self,
        population: usize,
        conf_level: f64,
        margin: f64,
        estimator: Estimator,
    ) -> Result<usize> {
        if population == 0 {
            return Err(SelectionError::empty("SampleSizeCalculator"));
        }
        if !(margin.is_finite() && margin > 0.0) {
            return Err(SelectionError::invalid(format!(
                "margin must be positive, got {margin}"
            )));
        }
        let z = z_score(conf_level)?;

        let variance = match estimator {
            Estimator::Proportion(p) => {
                if !(p > 0.0 && p < 1.0) {
                    return Err(SelectionError::invalid(format!(
                        "proportion p must be in (0, 1), got {p}"
                    )));
                }
                p * (1.0 - p)
            }
            Estimator::Mean(sigma) => {
                if !(sigma.is_finite() && sigma > 0.0) {
                    return Err(SelectionError::invalid(format!(
                        "sigma must be positive, got {sigma}"
                    )));
                }
                sigma * sigma
            }
        };

        let n0 = z * z * variance / (margin * margin);
        let k = finite_population_correction(n0, population);

        debug!(population, conf_level, margin, ?estimator, n0, k, "resolved sample size");
        Ok(k)
    }
}

/// Applies the finite-population correction and rounds up.
///
/// The result never exceeds the population. An `n0` that overflowed to
/// infinity has the whole population as its limit.
fn finite_population_correction(n0: f64, population: usize) -> usize {
    let n = population as f64;
    let corrected = n0 / (1.0 + (n0 - 1.0) / n);
    if !corrected.is_finite() {
        return population;
    }
    (corrected.ceil() as usize).min(population)
}

/// Sample size for estimating a proportion.
pub fn sample_size_proportion(
    population: usize,
    conf_level: f64,
    margin: f64,
    p: f64,
) -> Result<usize> {
    SampleSizeCalculator.size(population, conf_level, margin, Estimator::Proportion(p))
}

/// Sample size for estimating a mean.
pub fn sample_size_mean(
    population: usize,
    conf_level: f64,
    margin: f64,
    sigma: f64,
) -> Result<usize> {
    SampleSizeCalculator.size(population, conf_level, margin, Estimator::Mean(sigma))
}
