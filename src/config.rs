//! Configuration for the selection engine.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! environment variables. The CLI applies its flags last.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diversity::coreset::{DEFAULT_PARALLEL_THRESHOLD, DEFAULT_PROGRESS_INTERVAL};
use crate::relevance::{Bm25Params, NegativeConfig};
use crate::sampling::{SampleMode, SampleSpec};

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML file could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Coreset tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoresetConfig {
    /// Row count from which the distance update runs in parallel.
    pub parallel_threshold: usize,
    /// Picks between progress log lines (0 disables them).
    pub progress_interval: usize,
}

impl Default for CoresetConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Base seed for every random draw. `None` draws fresh entropy per call.
    pub seed: Option<u64>,
    /// Default sample sizing.
    pub sampling: SampleSpec,
    pub coreset: CoresetConfig,
    pub bm25: Bm25Params,
    pub negatives: NegativeConfig,
}

impl SelectorConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SELECTOR_SEED`: Base random seed (default: unset)
    /// - `SELECTOR_SAMPLE_MODE`: `manual`, `proportion` or `mean` (default: proportion)
    /// - `SELECTOR_SAMPLE_K`: Manual sample size
    /// - `SELECTOR_CONF_LEVEL`: Confidence level (default: 0.95)
    /// - `SELECTOR_MARGIN`: Margin of error (default: 0.05)
    /// - `SELECTOR_P`: Expected proportion (default: 0.5)
    /// - `SELECTOR_SIGMA`: Expected standard deviation (default: 1.0)
    /// - `SELECTOR_PARALLEL_THRESHOLD`: Coreset parallel row threshold (default: 4096)
    /// - `SELECTOR_BM25_K1`: BM25 k1 (default: 0.9)
    /// - `SELECTOR_BM25_B`: BM25 b (default: 0.4)
    /// - `SELECTOR_NUM_NEG`: Hard negatives per query (default: 7)
    /// - `SELECTOR_START_RANK`: Ranked entries skipped before mining (default: 3)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable holds an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Loads a YAML file; missing keys keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parses YAML text; missing keys keep their defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overrides fields from `SELECTOR_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SELECTOR_SEED") {
            self.seed = Some(parse_env_value(&val, "SELECTOR_SEED")?);
        }

        // Sampling settings
        if let Some(val) = lookup("SELECTOR_SAMPLE_MODE") {
            self.sampling.mode = parse_sample_mode(&val, "SELECTOR_SAMPLE_MODE")?;
        }
        if let Some(val) = lookup("SELECTOR_SAMPLE_K") {
            self.sampling.k = Some(parse_env_value(&val, "SELECTOR_SAMPLE_K")?);
        }
        if let Some(val) = lookup("SELECTOR_CONF_LEVEL") {
            self.sampling.conf_level = parse_env_value(&val, "SELECTOR_CONF_LEVEL")?;
        }
        if let Some(val) = lookup("SELECTOR_MARGIN") {
            self.sampling.margin = parse_env_value(&val, "SELECTOR_MARGIN")?;
        }
        if let Some(val) = lookup("SELECTOR_P") {
            self.sampling.p = parse_env_value(&val, "SELECTOR_P")?;
        }
        if let Some(val) = lookup("SELECTOR_SIGMA") {
            self.sampling.sigma = parse_env_value(&val, "SELECTOR_SIGMA")?;
        }

        // Coreset settings
        if let Some(val) = lookup("SELECTOR_PARALLEL_THRESHOLD") {
            self.coreset.parallel_threshold =
                parse_env_value(&val, "SELECTOR_PARALLEL_THRESHOLD")?;
        }

        // Relevance settings
        if let Some(val) = lookup("SELECTOR_BM25_K1") {
            self.bm25.k1 = parse_env_value(&val, "SELECTOR_BM25_K1")?;
        }
        if let Some(val) = lookup("SELECTOR_BM25_B") {
            self.bm25.b = parse_env_value(&val, "SELECTOR_BM25_B")?;
        }
        if let Some(val) = lookup("SELECTOR_NUM_NEG") {
            self.negatives.num_neg = parse_env_value(&val, "SELECTOR_NUM_NEG")?;
        }
        if let Some(val) = lookup("SELECTOR_START_RANK") {
            self.negatives.start_rank = parse_env_value(&val, "SELECTOR_START_RANK")?;
        }

        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Sampling validation
        if self.sampling.mode == SampleMode::Manual && self.sampling.k.unwrap_or(0) == 0 {
            return Err(ConfigError::ValidationFailed(
                "sampling.k must be greater than 0 in manual mode".to_string(),
            ));
        }
        if self.sampling.mode != SampleMode::Manual {
            crate::sampling::z_score(self.sampling.conf_level)
                .map_err(|e| ConfigError::ValidationFailed(e.to_string()))?;
        }
        if !(self.sampling.margin.is_finite() && self.sampling.margin > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "sampling.margin must be greater than 0".to_string(),
            ));
        }
        if self.sampling.mode == SampleMode::Proportion
            && !(self.sampling.p > 0.0 && self.sampling.p < 1.0)
        {
            return Err(ConfigError::ValidationFailed(
                "sampling.p must be between 0 and 1 (exclusive)".to_string(),
            ));
        }
        if self.sampling.mode == SampleMode::Mean
            && !(self.sampling.sigma.is_finite() && self.sampling.sigma > 0.0)
        {
            return Err(ConfigError::ValidationFailed(
                "sampling.sigma must be greater than 0".to_string(),
            ));
        }

        // Relevance validation
        self.bm25
            .validate()
            .map_err(|e| ConfigError::ValidationFailed(e.to_string()))?;
        if self.negatives.num_neg == 0 {
            return Err(ConfigError::ValidationFailed(
                "negatives.num_neg must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse an environment variable value.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a sample mode.
fn parse_sample_mode(value: &str, key: &str) -> Result<SampleMode, ConfigError> {
    SampleMode::from_str(value.trim(), true).map_err(|message| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    })
}
