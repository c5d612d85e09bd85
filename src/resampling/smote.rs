//! SMOTE oversampling of the minority class.
//!
//! Synthetic rows are interpolated between a minority sample and one of its
//! `k_neighbors` nearest minority neighbours until both classes have the
//! majority count. Only apply this to a training partition.
//!
//! # Example
//! ```
//! use mimic_classifier::resampling::Smote;
//! use ndarray::array;
//!
//! let x = array![[0.0], [0.1], [0.2], [0.3], [1.0], [1.1], [1.2]];
//! let y = vec![0, 0, 0, 0, 1, 1, 1];
//! let (x_res, y_res) = Smote::new(2, 42).fit_resample(&x, &y)?;
//! assert_eq!(x_res.nrows(), 8);
//! assert_eq!(y_res.iter().filter(|&&c| c == 1).count(), 4);
//! # Ok::<(), mimic_classifier::resampling::ResamplingError>(())
//! ```

use super::ResamplingError;
use crate::metrics::class_counts;
use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Synthetic minority oversampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Smote {
    pub k_neighbors: usize,
    pub seed: u64,
}

impl Default for Smote {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            seed: 0,
        }
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self { k_neighbors, seed }
    }

    /// Indices (into `minority`) of each row's `k` nearest other rows.
    fn neighbours(&self, minority: &Array2<f64>) -> Vec<Vec<usize>> {
        let n = minority.nrows();
        (0..n)
            .map(|i| {
                let mut others: Vec<(f64, usize)> = (0..n)
                    .filter(|&j| j != i)
                    .map(|j| (squared_distance(minority.row(i), minority.row(j)), j))
                    .collect();
                others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                others
                    .into_iter()
                    .take(self.k_neighbors)
                    .map(|(_, j)| j)
                    .collect()
            })
            .collect()
    }

    /// Balance `x`/`y` by appending synthetic minority rows.
    ///
    /// The original rows come first, unchanged, followed by the synthetic
    /// rows. Balanced input is returned as is.
    ///
    /// # Errors
    /// Mismatched lengths, non-binary or single-class labels, non-finite
    /// features, `k_neighbors == 0`, or a minority class with fewer than
    /// `k_neighbors + 1` members.
    pub fn fit_resample(
        &self,
        x: &Array2<f64>,
        y: &[usize],
    ) -> Result<(Array2<f64>, Vec<usize>), ResamplingError> {
        if self.k_neighbors == 0 {
            return Err(ResamplingError::InvalidParameter(
                "k_neighbors must be at least 1".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(ResamplingError::ShapeMismatch {
                rows: x.nrows(),
                labels: y.len(),
            });
        }
        if let Some(&label) = y.iter().find(|&&label| label > 1) {
            return Err(ResamplingError::InvalidLabel(label));
        }
        if !x.iter().all(|v| v.is_finite()) {
            return Err(ResamplingError::NonFinite);
        }

        let counts = class_counts(y);
        let (n_neg, n_pos) = (
            counts.get(&0).copied().unwrap_or(0),
            counts.get(&1).copied().unwrap_or(0),
        );
        if n_neg == 0 || n_pos == 0 {
            return Err(ResamplingError::SingleClass);
        }
        let (minority_class, n_minority, n_majority) = if n_pos < n_neg {
            (1, n_pos, n_neg)
        } else {
            (0, n_neg, n_pos)
        };
        let n_synthetic = n_majority - n_minority;
        if n_synthetic == 0 {
            return Ok((x.clone(), y.to_vec()));
        }
        if n_minority <= self.k_neighbors {
            return Err(ResamplingError::TooFewSamples {
                class: minority_class,
                count: n_minority,
                k_neighbors: self.k_neighbors,
            });
        }

        let minority_idx: Vec<usize> = (0..y.len()).filter(|&i| y[i] == minority_class).collect();
        let minority = x.select(Axis(0), &minority_idx);
        let neighbours = self.neighbours(&minority);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut synthetic = Array2::zeros((n_synthetic, x.ncols()));
        for mut row in synthetic.rows_mut() {
            let draw = rng.gen_range(0..n_minority * self.k_neighbors);
            let (base, nn) = (draw / self.k_neighbors, draw % self.k_neighbors);
            let step: f64 = rng.gen();

            let origin = minority.row(base);
            let target = minority.row(neighbours[base][nn]);
            for ((out, &a), &b) in row.iter_mut().zip(origin.iter()).zip(target.iter()) {
                *out = a + step * (b - a);
            }
        }

        let x_res = ndarray::concatenate(Axis(0), &[x.view(), synthetic.view()])
            .map_err(|e| ResamplingError::InvalidParameter(e.to_string()))?;
        let mut y_res = y.to_vec();
        y_res.extend(std::iter::repeat(minority_class).take(n_synthetic));

        log::info!(
            "SMOTE: class counts {:?} -> {:?}",
            counts,
            class_counts(&y_res)
        );
        Ok((x_res, y_res))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn imbalanced() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.2, 0.1],
            [0.3, 0.0],
            [0.4, 0.2],
            [0.5, 0.1],
            [0.6, 0.0],
            [0.7, 0.3],
            [2.0, 2.0],
            [2.2, 2.1],
            [2.1, 2.4],
            [2.5, 2.2],
        ];
        (x, vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1])
    }

    #[test]
    fn test_smote_balances_classes() {
        let (x, y) = imbalanced();
        let (x_res, y_res) = Smote::new(3, 10).fit_resample(&x, &y).unwrap();

        assert_eq!(x_res.nrows(), 16);
        assert_eq!(y_res.len(), 16);
        let counts = class_counts(&y_res);
        assert_eq!(counts.get(&0), Some(&8));
        assert_eq!(counts.get(&1), Some(&8));
    }

    #[test]
    fn test_smote_keeps_originals_first() {
        let (x, y) = imbalanced();
        let (x_res, y_res) = Smote::new(3, 10).fit_resample(&x, &y).unwrap();
        assert_eq!(x_res.slice(ndarray::s![..12, ..]), x);
        assert_eq!(&y_res[..12], &y[..]);
    }

    #[test]
    fn test_synthetic_rows_lie_in_minority_hull() {
        let (x, y) = imbalanced();
        let (x_res, _) = Smote::new(3, 1).fit_resample(&x, &y).unwrap();
        for row in x_res.slice(ndarray::s![12.., ..]).rows() {
            assert!((2.0..=2.5).contains(&row[0]));
            assert!((2.0..=2.4).contains(&row[1]));
        }
    }

    #[test]
    fn test_smote_is_deterministic_per_seed() {
        let (x, y) = imbalanced();
        let a = Smote::new(3, 10).fit_resample(&x, &y).unwrap();
        let b = Smote::new(3, 10).fit_resample(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_smote_balanced_input_is_unchanged() {
        let x = array![[0.0], [1.0]];
        let (x_res, y_res) = Smote::default().fit_resample(&x, &[0, 1]).unwrap();
        assert_eq!(x_res, x);
        assert_eq!(y_res, vec![0, 1]);
    }

    #[test]
    fn test_smote_too_few_minority_samples() {
        let (x, y) = imbalanced();
        let result = Smote::default().fit_resample(&x, &y);
        assert!(matches!(
            result,
            Err(ResamplingError::TooFewSamples {
                class: 1,
                count: 4,
                k_neighbors: 5
            })
        ));
    }

    #[test]
    fn test_smote_single_class() {
        let x = array![[0.0], [1.0]];
        assert!(matches!(
            Smote::default().fit_resample(&x, &[1, 1]),
            Err(ResamplingError::SingleClass)
        ));
    }
}
