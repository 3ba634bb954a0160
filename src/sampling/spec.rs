//! How a target sample size is determined.

use serde::{Deserialize, Serialize};

use super::size::{Estimator, SampleSizeCalculator};
use crate::error::{Result, SelectionError};

/// Sizing mode for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// The caller supplies `k` directly.
    Manual,
    /// `k` from Cochran's formula for a proportion.
    Proportion,
    /// `k` from Cochran's formula for a mean.
    Mean,
}

/// `{mode, k?, conf_level, margin, p, sigma}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSpec {
    pub mode: SampleMode,
    /// Required in manual mode, ignored otherwise.
    pub k: Option<usize>,
    pub conf_level: f64,
    pub margin: f64,
    pub p: f64,
    pub sigma: f64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            mode: SampleMode::Proportion,
            k: None,
            conf_level: 0.95,
            margin: 0.05,
            p: 0.5,
            sigma: 1.0,
        }
    }
}

impl SampleSpec {
    /// A manual-mode spec for exactly `k` records.
    pub fn manual(k: usize) -> Self {
        Self {
            mode: SampleMode::Manual,
            k: Some(k),
            ..Self::default()
        }
    }

    /// A proportion-mode spec.
    pub fn proportion(conf_level: f64, margin: f64, p: f64) -> Self {
        Self {
            mode: SampleMode::Proportion,
            conf_level,
            margin,
            p,
            ..Self::default()
        }
    }

    /// A mean-mode spec.
    pub fn mean(conf_level: f64, margin: f64, sigma: f64) -> Self {
        Self {
            mode: SampleMode::Mean,
            conf_level,
            margin,
            sigma,
            ..Self::default()
        }
    }

    /// Resolves the target size `k` for a corpus of `population` records.
    ///
    /// Manual mode does not need the population and may return `k > N`;
    /// the reservoir then keeps every record.
    pub fn resolve(&self, population: usize) -> Result<usize> {
        match self.mode {
            SampleMode::Manual => match self.k {
                Some(k) if k > 0 => Ok(k),
                Some(_) => Err(SelectionError::invalid(
                    "manual sample size k must be greater than 0",
                )),
                None => Err(SelectionError::invalid("manual mode requires k")),
            },
            SampleMode::Proportion => SampleSizeCalculator.size(
                population,
                self.conf_level,
                self.margin,
                Estimator::Proportion(self.p),
            ),
            SampleMode::Mean => SampleSizeCalculator.size(
                population,
                self.conf_level,
                self.margin,
                Estimator::Mean(self.sigma),
            ),
        }
    }

    /// Returns true if resolving this spec needs the corpus size up front.
    pub fn needs_population(&self) -> bool {
        self.mode != SampleMode::Manual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_resolve() {
        assert_eq!(SampleSpec::manual(12).resolve(5).unwrap(), 12);
        assert!(!SampleSpec::manual(12).needs_population());
    }

    #[test]
    fn test_manual_rejects_zero_or_missing_k() {
        assert!(matches!(
            SampleSpec::manual(0).resolve(10),
            Err(SelectionError::InvalidArgument(_))
        ));
        let spec = SampleSpec {
            mode: SampleMode::Manual,
            k: None,
            ..SampleSpec::default()
        };
        assert!(spec.resolve(10).is_err());
    }

    #[test]
    fn test_statistical_modes_resolve() {
        assert_eq!(
            SampleSpec::proportion(0.95, 0.03, 0.5).resolve(10_000).unwrap(),
            965
        );
        assert_eq!(SampleSpec::mean(0.95, 1.0, 10.0).resolve(10_000).unwrap(), 370);
        assert!(SampleSpec::mean(0.95, 1.0, 10.0).needs_population());
    }

    #[test]
    fn test_deserialize_partial_spec() {
        let spec: SampleSpec =
            serde_yaml::from_str("mode: manual\nk: 40\n").expect("valid yaml");
        assert_eq!(spec.mode, SampleMode::Manual);
        assert_eq!(spec.k, Some(40));
        assert_eq!(spec.conf_level, 0.95, "missing fields fall back to defaults");
    }
}
