//! Error types for data selection operations.
//!
//! Every public operation in the crate fails fast at its call boundary with
//! one of the variants below:
//! - `InvalidArgument` for bad caller input (sizes, ratios, ids, dimensions)
//! - `EmptyCorpus` when a component receives zero records
//! - `InternalConsistency` for bookkeeping faults that indicate a defect
//! - `Cancelled` when a cooperative cancellation flag was raised mid-run
//!
//! Under-filled results (fewer negatives than requested, a reservoir smaller
//! than `k`) are not errors; see [`crate::record::SelectionResult`].

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SelectionError>;

/// Errors that can occur during sampling, coreset selection or relevance mining.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Empty corpus passed to {component}")]
    EmptyCorpus { component: &'static str },

    #[error("Internal consistency fault: {0}")]
    InternalConsistency(String),

    #[error("Selection was cancelled before completion")]
    Cancelled,
}

impl SelectionError {
    /// Builds an `InvalidArgument` from anything string-like.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Builds an `EmptyCorpus` for the named component.
    pub fn empty(component: &'static str) -> Self {
        Self::EmptyCorpus { component }
    }

    /// Returns true for errors that signal a defect rather than bad input.
    ///
    /// Callers should skip or report recoverable errors, but must not retry
    /// a fatal one.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InternalConsistency(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SelectionError::invalid("ratio must be in (0, 1], got 1.5");
        assert_eq!(
            err.to_string(),
            "Invalid argument: ratio must be in (0, 1], got 1.5"
        );

        let err = SelectionError::empty("ReservoirSampler");
        assert_eq!(err.to_string(), "Empty corpus passed to ReservoirSampler");
    }

    #[test]
    fn test_is_fatal() {
        assert!(SelectionError::InternalConsistency("reselected 3".into()).is_fatal());
        assert!(!SelectionError::invalid("bad").is_fatal());
        assert!(!SelectionError::empty("CoresetSelector").is_fatal());
        assert!(!SelectionError::Cancelled.is_fatal());
    }
}
