//! Distance computations over embedding matrices.
//!
//! Embeddings arrive as an `N × D` matrix, one row per corpus record. The
//! min-distance update used by coreset selection is data-parallel across rows,
//! so large matrices are processed with rayon through `ndarray::Zip`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};

use crate::error::{Result, SelectionError};

/// Row-major matrix of embedding vectors, one row per record.
pub type EmbeddingMatrix = Array2<f32>;

/// Builds an embedding matrix from caller-supplied vectors.
///
/// # Errors
///
/// - `EmptyCorpus` if `vectors` is empty.
/// - `InvalidArgument` if the vectors do not all share one non-zero
///   dimension, or if any component is NaN or infinite.
pub fn embedding_matrix(vectors: &[Vec<f32>]) -> Result<EmbeddingMatrix> {
    let Some(first) = vectors.first() else {
        return Err(SelectionError::empty("CoresetSelector"));
    };
    let dimension = first.len();

    let mut flat = Vec::with_capacity(vectors.len() * dimension);
    for (i, vector) in vectors.iter().enumerate() {
        if vector.len() != dimension {
            return Err(SelectionError::invalid(format!(
                "embedding dimension mismatch: vector {i} has {} components, expected {dimension}",
                vector.len()
            )));
        }
        flat.extend_from_slice(vector);
    }

    let matrix = Array2::from_shape_vec((vectors.len(), dimension), flat)
        .map_err(|e| SelectionError::invalid(format!("invalid embedding shape: {e}")))?;
    validate_embeddings(matrix.view())?;
    Ok(matrix)
}

/// Checks that a matrix is usable for distance computations.
pub fn validate_embeddings(vectors: ArrayView2<'_, f32>) -> Result<()> {
    if vectors.nrows() == 0 {
        return Err(SelectionError::empty("CoresetSelector"));
    }
    if vectors.ncols() == 0 {
        return Err(SelectionError::invalid("embedding dimension must be at least 1"));
    }
    if let Some(((row, col), value)) = vectors.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(SelectionError::invalid(format!(
            "embedding {row} has non-finite component {value} at position {col}"
        )));
    }
    Ok(())
}

/// Euclidean (L2) distance between two vectors. Not squared.
///
/// # Panics
///
/// Panics if vectors have different lengths.
pub fn euclidean_distance(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    assert_eq!(
        a.len(),
        b.len(),
        "Vectors must have the same length for Euclidean distance"
    );

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Lowers every entry of `min_distances` to the distance between its row
/// and `center`, if that distance is smaller.
///
/// `min_distances` must have one entry per row of `vectors`.
pub fn update_min_distances(
    min_distances: &mut Array1<f32>,
    vectors: ArrayView2<'_, f32>,
    center: ArrayView1<'_, f32>,
    parallel: bool,
) {
    let update = |current: &mut f32, row: ArrayView1<'_, f32>| {
        let distance = euclidean_distance(row, center);
        if distance < *current {
            *current = distance;
        }
    };

    let zip = Zip::from(min_distances).and(vectors.rows());
    if parallel {
        zip.par_for_each(update);
    } else {
        zip.for_each(update);
    }
}

/// Index of the largest value, first occurrence on ties.
///
/// Returns `None` for an empty array or an array holding only NaN.
pub fn argmax(values: &Array1<f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in values.iter().enumerate() {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ if value.is_nan() => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_euclidean_distance_same() {
        let a = array![1.0_f32, 2.0, 3.0];
        assert!(euclidean_distance(a.view(), a.view()) < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_is_not_squared() {
        let a = array![0.0_f32, 0.0];
        let b = array![3.0_f32, 4.0];
        assert!((euclidean_distance(a.view(), b.view()) - 5.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "Vectors must have the same length")]
    fn test_euclidean_distance_different_lengths() {
        let a = array![1.0_f32, 2.0];
        let b = array![1.0_f32, 2.0, 3.0];
        euclidean_distance(a.view(), b.view());
    }

    #[test]
    fn test_embedding_matrix_shape() {
        let matrix = embedding_matrix(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(matrix.shape(), &[3, 2]);
        assert_eq!(matrix[[2, 1]], 6.0);
    }

    #[test]
    fn test_embedding_matrix_dimension_mismatch() {
        let err = embedding_matrix(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, SelectionError::InvalidArgument(_)));
    }

    #[test]
    fn test_embedding_matrix_rejects_empty_and_non_finite() {
        assert!(matches!(
            embedding_matrix(&[]),
            Err(SelectionError::EmptyCorpus { .. })
        ));
        assert!(embedding_matrix(&[vec![]]).is_err());
        assert!(embedding_matrix(&[vec![1.0, f32::NAN]]).is_err());
        assert!(embedding_matrix(&[vec![f32::INFINITY]]).is_err());
    }

    #[test]
    fn test_update_min_distances_sequential_and_parallel_agree() {
        let vectors = array![[0.0_f32, 0.0], [3.0, 4.0], [6.0, 8.0], [1.0, 0.0]];
        let center = array![0.0_f32, 0.0];

        let mut sequential = Array1::from_elem(4, f32::INFINITY);
        update_min_distances(&mut sequential, vectors.view(), center.view(), false);

        let mut parallel = Array1::from_elem(4, f32::INFINITY);
        update_min_distances(&mut parallel, vectors.view(), center.view(), true);

        assert_eq!(sequential, parallel);
        assert!((sequential[1] - 5.0).abs() < 1e-6);
        assert!((sequential[2] - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_update_min_distances_keeps_smaller_values() {
        let vectors = array![[0.0_f32], [10.0]];
        let mut min_distances = array![0.5_f32, 2.0];
        update_min_distances(&mut min_distances, vectors.view(), array![5.0_f32].view(), false);
        assert_eq!(min_distances, array![0.5_f32, 2.0]);
    }

    #[test]
    fn test_argmax_first_on_ties() {
        assert_eq!(argmax(&array![1.0_f32, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax(&array![f32::NAN, 0.5]), Some(1));
        assert_eq!(argmax(&Array1::<f32>::zeros(0)), None);
    }
}
