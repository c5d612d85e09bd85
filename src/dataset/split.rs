//! Seeded train/test partitioning.

use super::DatasetError;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Result of [`train_test_split`].
#[derive(Clone, Debug, PartialEq)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Vec<usize>,
    pub y_test: Vec<usize>,
    /// Source row of each training sample.
    pub train_indices: Vec<usize>,
    /// Source row of each test sample.
    pub test_indices: Vec<usize>,
}

/// Shuffle rows with a seeded RNG and hold out `ceil(test_size * n)` of them.
///
/// The first `n_test` entries of the permutation form the test set, the rest
/// the training set. The same `(x, y, test_size, seed)` always yields the same
/// partition.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &[usize],
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit, DatasetError> {
    let n = x.nrows();
    if y.len() != n {
        return Err(DatasetError::ShapeMismatch {
            rows: n,
            labels: y.len(),
        });
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(DatasetError::InvalidTestSize(test_size));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(DatasetError::EmptyPartition { n_train, n_test });
    }

    let mut permutation: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let test_indices = permutation[..n_test].to_vec();
    let train_indices = permutation[n_test..].to_vec();

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), &train_indices),
        x_test: x.select(Axis(0), &test_indices),
        y_train: train_indices.iter().map(|&i| y[i]).collect(),
        y_test: test_indices.iter().map(|&i| y[i]).collect(),
        train_indices,
        test_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> (Array2<f64>, Vec<usize>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * 10 + j) as f64);
        let y = (0..n).map(|i| i % 2).collect();
        (x, y)
    }

    #[test]
    fn test_split_sizes() {
        let (x, y) = data(10);
        let split = train_test_split(&x, &y, 0.3, 5).unwrap();
        assert_eq!(split.x_test.nrows(), 3);
        assert_eq!(split.x_train.nrows(), 7);
        assert_eq!(split.y_test.len(), 3);
        assert_eq!(split.y_train.len(), 7);
    }

    #[test]
    fn test_split_is_a_partition() {
        let (x, y) = data(23);
        let split = train_test_split(&x, &y, 0.2, 10).unwrap();
        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(split.test_indices.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..23).collect::<Vec<_>>());

        for (pos, &row) in split.test_indices.iter().enumerate() {
            assert_eq!(split.x_test.row(pos), x.row(row));
            assert_eq!(split.y_test[pos], y[row]);
        }
    }

    #[test]
    fn test_split_is_deterministic_per_seed() {
        let (x, y) = data(40);
        let a = train_test_split(&x, &y, 0.25, 7).unwrap();
        let b = train_test_split(&x, &y, 0.25, 7).unwrap();
        let c = train_test_split(&x, &y, 0.25, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn test_split_rejects_bad_inputs() {
        let (x, y) = data(4);
        assert!(matches!(
            train_test_split(&x, &y, 1.5, 0),
            Err(DatasetError::InvalidTestSize(_))
        ));
        assert!(matches!(
            train_test_split(&x, &y[..3], 0.5, 0),
            Err(DatasetError::ShapeMismatch { .. })
        ));
        let (x1, y1) = data(1);
        assert!(matches!(
            train_test_split(&x1, &y1, 0.5, 0),
            Err(DatasetError::EmptyPartition { .. })
        ));
    }
}
