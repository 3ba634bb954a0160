//! Greedy farthest-point coreset selection ("k-center greedy").
//!
//! Algorithm:
//! 1. Start from a random center, or from the caller's already-selected set
//! 2. Track each vector's distance to its nearest selected center
//! 3. Repeatedly pick the vector farthest from every center, until
//!    `⌊N · ratio⌋` new centers are chosen
//!
//! The per-iteration distance update runs across all rows in parallel once the
//! matrix is large enough; the iterations themselves are strictly sequential.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{Array1, ArrayView2};
use rand::RngExt;
use tracing::{debug, info};

use super::distance::{argmax, update_min_distances, validate_embeddings};
use crate::error::{Result, SelectionError};
use crate::record::SelectionResult;

/// Default number of rows from which the distance update goes parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// Default number of picks between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

/// Distance pinned on chosen centers. Below every real distance, so exact
/// duplicates of a center are never confused with the center itself.
const SELECTED_DISTANCE: f32 = -1.0;

/// Diversity-maximizing subset selector over embedding vectors.
#[derive(Debug, Clone)]
pub struct CoresetSelector {
    /// Row count from which the distance update runs on the rayon pool.
    parallel_threshold: usize,

    /// Picks between progress log lines (0 disables them).
    progress_interval: usize,

    /// Raised by another thread to abandon a running selection.
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for CoresetSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl CoresetSelector {
    /// Creates a selector with default settings.
    pub fn new() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cancel: None,
        }
    }

    /// Sets the row count from which distance updates run in parallel.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Sets how often progress is logged.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Attaches a cancellation flag checked before every pick.
    ///
    /// A cancelled run returns `SelectionError::Cancelled`; no partial
    /// coreset is ever returned.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Selects `⌊N · ratio⌋` distinct row indices from `vectors`.
    ///
    /// The first center is drawn uniformly from `rng`; every later one is the
    /// row farthest from all centers chosen so far.
    ///
    /// # Errors
    ///
    /// - `EmptyCorpus` if `vectors` has no rows.
    /// - `InvalidArgument` if `ratio` is outside `(0, 1]` or the matrix holds
    ///   non-finite values.
    /// - `Cancelled` if the cancellation flag was raised.
    /// - `InternalConsistency` if a chosen index was already selected.
    pub fn select<R: RngExt>(
        &self,
        vectors: ArrayView2<'_, f32>,
        ratio: f64,
        rng: &mut R,
    ) -> Result<SelectionResult<usize>> {
        self.select_from(vectors, ratio, &[], rng)
    }

    /// Like [`select`](Self::select), continuing from `already_selected`.
    ///
    /// Prior centers seed the distance state and are never returned again;
    /// the result holds only new picks. When prior centers exist no random
    /// draw is made. If fewer unselected rows remain than requested, the
    /// result is under-filled rather than an error.
    pub fn select_from<R: RngExt>(
        &self,
        vectors: ArrayView2<'_, f32>,
        ratio: f64,
        already_selected: &[usize],
        rng: &mut R,
    ) -> Result<SelectionResult<usize>> {
        if !(ratio.is_finite() && ratio > 0.0 && ratio <= 1.0) {
            return Err(SelectionError::invalid(format!(
                "ratio must be in (0, 1], got {ratio}"
            )));
        }
        validate_embeddings(vectors)?;

        let n = vectors.nrows();
        let mut is_selected = vec![false; n];
        for &index in already_selected {
            if index >= n {
                return Err(SelectionError::invalid(format!(
                    "already-selected index {index} out of range for {n} vectors"
                )));
            }
            if std::mem::replace(&mut is_selected[index], true) {
                return Err(SelectionError::invalid(format!(
                    "already-selected index {index} appears more than once"
                )));
            }
        }

        let requested = (n as f64 * ratio).floor() as usize;
        let budget = requested.min(n - already_selected.len());
        if budget == 0 {
            debug!(n, ratio, "coreset budget is empty");
            return Ok(SelectionResult::new(Vec::new(), requested));
        }

        let parallel = n >= self.parallel_threshold;
        let mut min_distances = Array1::from_elem(n, f32::INFINITY);
        for &index in already_selected {
            update_min_distances(&mut min_distances, vectors, vectors.row(index), parallel);
        }
        for &index in already_selected {
            min_distances[index] = SELECTED_DISTANCE;
        }

        info!(
            n,
            dimension = vectors.ncols(),
            prior = already_selected.len(),
            budget,
            parallel,
            "starting coreset selection"
        );

        let mut picked = Vec::with_capacity(budget);
        while picked.len() < budget {
            if self.is_cancelled() {
                return Err(SelectionError::Cancelled);
            }

            let next = if picked.is_empty() && already_selected.is_empty() {
                rng.random_range(0..n)
            } else {
                argmax(&min_distances).ok_or_else(|| {
                    SelectionError::InternalConsistency(
                        "min-distance array has no maximum".to_string(),
                    )
                })?
            };

            if std::mem::replace(&mut is_selected[next], true) {
                return Err(SelectionError::InternalConsistency(format!(
                    "index {next} chosen twice during coreset selection"
                )));
            }
            min_distances[next] = SELECTED_DISTANCE;
            picked.push(next);

            if picked.len() < budget {
                update_min_distances(&mut min_distances, vectors, vectors.row(next), parallel);
            }

            if self.progress_interval > 0 && picked.len() % self.progress_interval == 0 {
                debug!(picked = picked.len(), budget, "coreset progress");
            }
        }

        Ok(SelectionResult::new(picked, requested))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn line_points(n: usize) -> Array2<f32> {
        Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f32 } else { 0.0 })
    }

    #[test]
    fn test_select_size_and_uniqueness() {
        let vectors = line_points(50);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let result = CoresetSelector::new()
            .select(vectors.view(), 0.2, &mut rng)
            .unwrap();

        assert_eq!(result.achieved, 10);
        let unique: HashSet<_> = result.items.iter().collect();
        assert_eq!(unique.len(), 10, "all selected indices must be distinct");
    }

    #[test]
    fn test_second_pick_is_farthest_point() {
        let vectors = line_points(11);
        let selector = CoresetSelector::new();
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = selector.select(vectors.view(), 0.2, &mut rng).unwrap();
            let (first, second) = (result.items[0], result.items[1]);
            // From the midpoint both endpoints tie; the lower index wins.
            let expected = if first < 5 { 10 } else { 0 };
            assert_eq!(second, expected, "second pick from {first} must be an endpoint");
        }
    }

    #[test]
    fn test_tiny_ratio_gives_empty_result() {
        let vectors = line_points(10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = CoresetSelector::new()
            .select(vectors.view(), 0.05, &mut rng)
            .unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.requested, 0);
    }

    #[test]
    fn test_single_vector() {
        let vectors = array![[1.0_f32, 2.0, 3.0]];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let result = CoresetSelector::new()
            .select(vectors.view(), 1.0, &mut rng)
            .unwrap();
        assert_eq!(result.items, vec![0]);
    }

    #[test]
    fn test_full_ratio_selects_everything() {
        let vectors = line_points(8);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut items = CoresetSelector::new()
            .select(vectors.view(), 1.0, &mut rng)
            .unwrap()
            .items;
        items.sort();
        assert_eq!(items, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_duplicate_vectors_do_not_fault() {
        let vectors = Array2::<f32>::zeros((6, 3));
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let result = CoresetSelector::new()
            .select(vectors.view(), 1.0, &mut rng)
            .unwrap();
        let unique: HashSet<_> = result.items.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_invalid_ratio() {
        let vectors = line_points(4);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let selector = CoresetSelector::new();
        for ratio in [0.0, -0.5, 1.5, f64::NAN] {
            let err = selector.select(vectors.view(), ratio, &mut rng).unwrap_err();
            assert!(matches!(err, SelectionError::InvalidArgument(_)), "ratio {ratio}");
        }
    }

    #[test]
    fn test_empty_matrix() {
        let vectors = Array2::<f32>::zeros((0, 4));
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = CoresetSelector::new()
            .select(vectors.view(), 0.5, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SelectionError::EmptyCorpus { .. }));
    }

    #[test]
    fn test_continue_from_prior_selection() {
        let vectors = line_points(11);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = CoresetSelector::new()
            .select_from(vectors.view(), 0.2, &[0], &mut rng)
            .unwrap();

        assert_eq!(result.items[0], 10, "farthest from prior center 0");
        assert_eq!(result.items[1], 5, "midpoint splits the gap");
        assert!(!result.items.contains(&0));
    }

    #[test]
    fn test_prior_selection_limits_budget() {
        let vectors = line_points(4);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = CoresetSelector::new()
            .select_from(vectors.view(), 1.0, &[1, 2, 3], &mut rng)
            .unwrap();
        assert_eq!(result.items, vec![0]);
        assert_eq!(result.requested, 4);
        assert!(result.is_underfilled());
    }

    #[test]
    fn test_invalid_prior_selection() {
        let vectors = line_points(4);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let selector = CoresetSelector::new();
        assert!(selector
            .select_from(vectors.view(), 0.5, &[7], &mut rng)
            .is_err());
        assert!(selector
            .select_from(vectors.view(), 0.5, &[1, 1], &mut rng)
            .is_err());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let vectors = Array2::from_shape_fn((300, 4), |(i, j)| ((i * 31 + j * 17) % 97) as f32);
        let sequential = CoresetSelector::new()
            .with_parallel_threshold(usize::MAX)
            .select(vectors.view(), 0.1, &mut ChaCha8Rng::seed_from_u64(4))
            .unwrap();
        let parallel = CoresetSelector::new()
            .with_parallel_threshold(1)
            .select(vectors.view(), 0.1, &mut ChaCha8Rng::seed_from_u64(4))
            .unwrap();
        assert_eq!(sequential.items, parallel.items);
    }

    #[test]
    fn test_cancelled_selection_returns_error() {
        let vectors = line_points(20);
        let flag = Arc::new(AtomicBool::new(true));
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = CoresetSelector::new()
            .with_cancel_flag(flag)
            .select(vectors.view(), 0.5, &mut rng)
            .unwrap_err();
        assert_eq!(err, SelectionError::Cancelled);
    }
}
