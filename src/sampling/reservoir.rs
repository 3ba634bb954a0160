//! One-pass uniform sampling (Algorithm R).
//!
//! After `t` records have been pushed, every one of them is in the reservoir
//! with probability exactly `min(k, t) / t`. The reservoir state is valid after
//! any prefix, so a caller may stop feeding records early and still hold a
//! uniform sample of what it has seen.

use rand::RngExt;
use tracing::debug;

use crate::error::{Result, SelectionError};
use crate::record::SelectionResult;

/// Upper bound on up-front allocation; larger reservoirs grow on demand.
const RESERVOIR_PREALLOC_LIMIT: usize = 1 << 16;

/// Incremental reservoir of capacity `k`.
#[derive(Debug, Clone)]
pub struct Reservoir<T> {
    capacity: usize,
    seen: usize,
    items: Vec<T>,
}

impl<T> Reservoir<T> {
    /// Creates an empty reservoir holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SelectionError::invalid(
                "reservoir size k must be greater than 0",
            ));
        }
        Ok(Self {
            capacity,
            seen: 0,
            items: Vec::with_capacity(capacity.min(RESERVOIR_PREALLOC_LIMIT)),
        })
    }

    /// Offers the next record of the stream to the reservoir.
    pub fn push<R: RngExt>(&mut self, item: T, rng: &mut R) {
        self.seen += 1;
        if self.items.len() < self.capacity {
            self.items.push(item);
            return;
        }
        let j = rng.random_range(0..self.seen);
        if j < self.capacity {
            self.items[j] = item;
        }
    }

    /// Number of records offered so far.
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current contents, a uniform sample of everything seen so far.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Consumes the reservoir and returns the sample.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCorpus` if no record was ever pushed.
    pub fn finish(self) -> Result<SelectionResult<T>> {
        if self.seen == 0 {
            return Err(SelectionError::empty("ReservoirSampler"));
        }
        debug!(
            seen = self.seen,
            requested = self.capacity,
            achieved = self.items.len(),
            "reservoir sampling complete"
        );
        Ok(SelectionResult::new(self.items, self.capacity))
    }
}

/// Stateless front door over [`Reservoir`] for whole streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReservoirSampler;

impl ReservoirSampler {
    /// Samples `k` records uniformly without replacement from `records`.
    ///
    /// The stream is consumed exactly once and never buffered beyond `k`
    /// items. If the stream holds fewer than `k` records, all of them are
    /// returned and the result reports the under-fill.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `k` is 0.
    /// - `EmptyCorpus` if the stream is empty.
    pub fn sample<T, I, R>(
        &self,
        records: I,
        k: usize,
        rng: &mut R,
    ) -> Result<SelectionResult<T>>
    where
        I: IntoIterator<Item = T>,
        R: RngExt,
    {
        let mut reservoir = Reservoir::new(k)?;
        for record in records {
            reservoir.push(record, rng);
        }
        reservoir.finish()
    }

    /// Samples `k` indices from `0..population` without touching any records.
    pub fn sample_indices<R: RngExt>(
        &self,
        population: usize,
        k: usize,
        rng: &mut R,
    ) -> Result<SelectionResult<usize>> {
        self.sample(0..population, k, rng)
    }
}
