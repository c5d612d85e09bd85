//! Exhaustive hyperparameter search over `C` × `gamma`.
//!
//! Every candidate is scored by mean accuracy over stratified k-fold
//! cross-validation. Candidates are independent, so they run on the rayon
//! pool; results come back in grid order (`C` outer, `gamma` inner) and the
//! first candidate with the maximal mean score wins. The winner is refit on
//! the full training data.

use super::kernel::Gamma;
use super::svc::{FittedSvc, Svc};
use super::{check_training_data, InferenceModel, ModelError};
use crate::metrics::accuracy;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// `num` evenly spaced values over `[start, stop]`, endpoints included.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i == num - 1 { stop } else { start + i as f64 * step })
                .collect()
        }
    }
}

/// Candidate values for `C` and `gamma`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub c: Vec<f64>,
    pub gamma: Vec<f64>,
}

impl ParamGrid {
    pub fn new(c: Vec<f64>, gamma: Vec<f64>) -> Self {
        Self { c, gamma }
    }

    /// The same `linspace(start, stop, num)` axis for both parameters.
    pub fn linspace(start: f64, stop: f64, num: usize) -> Self {
        let axis = linspace(start, stop, num);
        Self::new(axis.clone(), axis)
    }

    /// Drop values that are not valid for an SVC (`<= 0` or non-finite).
    pub fn positive_only(mut self) -> Self {
        let keep = |v: &f64| v.is_finite() && *v > 0.0;
        self.c.retain(keep);
        self.gamma.retain(keep);
        self
    }

    /// Cartesian product in evaluation order, `C` outer.
    pub fn candidates(&self) -> Vec<(f64, f64)> {
        self.c
            .iter()
            .flat_map(|&c| self.gamma.iter().map(move |&g| (c, g)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.c.len() * self.gamma.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.is_empty() {
            return Err(ModelError::InvalidParameter(
                "parameter grid is empty".to_string(),
            ));
        }
        for (name, values) in [("C", &self.c), ("gamma", &self.gamma)] {
            if let Some(bad) = values.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
                return Err(ModelError::InvalidParameter(format!(
                    "{name} candidate {bad} is not positive"
                )));
            }
        }
        Ok(())
    }
}

/// Cross-validation settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidation {
    pub n_folds: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for CrossValidation {
    fn default() -> Self {
        Self {
            n_folds: 5,
            shuffle: false,
            seed: 0,
        }
    }
}

/// Stratified k-fold `(train, test)` index pairs.
///
/// Members of each class are dealt round-robin over the folds (after a
/// seeded shuffle when enabled), so every fold keeps the class proportions.
pub fn stratified_k_fold(
    y: &[usize],
    cv: &CrossValidation,
) -> Result<Vec<(Vec<usize>, Vec<usize>)>, ModelError> {
    if cv.n_folds < 2 {
        return Err(ModelError::InvalidParameter(format!(
            "n_folds must be at least 2, got {}",
            cv.n_folds
        )));
    }

    let n_classes = y.iter().max().map_or(0, |&m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &label) in y.iter().enumerate() {
        by_class[label].push(i);
    }

    let mut rng = StdRng::seed_from_u64(cv.seed);
    let mut fold_of = vec![0usize; y.len()];
    for (class, members) in by_class.iter_mut().enumerate() {
        if members.is_empty() {
            continue;
        }
        if members.len() < cv.n_folds {
            return Err(ModelError::TooFewSamples {
                class,
                count: members.len(),
                n_folds: cv.n_folds,
            });
        }
        if cv.shuffle {
            members.shuffle(&mut rng);
        }
        for (k, &i) in members.iter().enumerate() {
            fold_of[i] = k % cv.n_folds;
        }
    }

    Ok((0..cv.n_folds)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| fold_of[i] == fold);
            (train, test)
        })
        .collect())
}

/// Cross-validation scores of one candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub c: f64,
    pub gamma: f64,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

/// What the search found, kept next to the refit model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub best_c: f64,
    pub best_gamma: f64,
    pub best_score: f64,
    pub n_folds: usize,
    pub trials: Vec<TrialResult>,
}

/// Grid search around a base [`Svc`] (kernel, class weights, tolerances).
#[derive(Clone, Debug)]
pub struct GridSearch {
    estimator: Svc,
    grid: ParamGrid,
    cv: CrossValidation,
}

impl GridSearch {
    pub fn new(estimator: Svc, grid: ParamGrid) -> Self {
        Self {
            estimator,
            grid,
            cv: CrossValidation::default(),
        }
    }

    pub fn with_cv(mut self, cv: CrossValidation) -> Self {
        self.cv = cv;
        self
    }

    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    fn candidate(&self, c: f64, gamma: f64) -> Svc {
        self.estimator.clone().with_c(c).with_gamma(Gamma::Value(gamma))
    }

    fn evaluate(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        folds: &[(Vec<usize>, Vec<usize>)],
        c: f64,
        gamma: f64,
    ) -> Result<TrialResult, ModelError> {
        let svc = self.candidate(c, gamma);
        let fold_scores = folds
            .iter()
            .map(|(train, test)| {
                let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
                let y_test: Vec<usize> = test.iter().map(|&i| y[i]).collect();
                let fitted = svc.fit(&x.select(Axis(0), train), &y_train)?;
                accuracy(&y_test, &fitted.predict(&x.select(Axis(0), test))?)
            })
            .collect::<Result<Vec<f64>, ModelError>>()?;

        let n = fold_scores.len() as f64;
        let mean_score = fold_scores.iter().sum::<f64>() / n;
        let std_score =
            (fold_scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n).sqrt();
        log::debug!("C={c:.4} gamma={gamma:.4}: mean accuracy {mean_score:.4} (+/- {std_score:.4})");

        Ok(TrialResult {
            c,
            gamma,
            fold_scores,
            mean_score,
            std_score,
        })
    }

    /// Search the grid, then refit the best candidate on all of `x`.
    pub fn fit(&self, x: &Array2<f64>, y: &[usize]) -> Result<FittedGridSearch, ModelError> {
        self.grid.validate()?;
        self.estimator.config().validate()?;
        check_training_data(x, y)?;

        let folds = stratified_k_fold(y, &self.cv)?;
        let candidates = self.grid.candidates();
        log::info!(
            "Grid search: {} candidates x {} folds",
            candidates.len(),
            folds.len()
        );

        let trials = candidates
            .par_iter()
            .map(|&(c, gamma)| self.evaluate(x, y, &folds, c, gamma))
            .collect::<Result<Vec<_>, ModelError>>()?;

        let mut best = &trials[0];
        for trial in &trials[1..] {
            if trial.mean_score > best.mean_score {
                best = trial;
            }
        }
        log::info!(
            "Best parameters: C={}, gamma={} (mean accuracy {:.4})",
            best.c,
            best.gamma,
            best.mean_score
        );

        let best_estimator = self.candidate(best.c, best.gamma).fit(x, y)?;
        let summary = SearchSummary {
            best_c: best.c,
            best_gamma: best.gamma,
            best_score: best.mean_score,
            n_folds: self.cv.n_folds,
            trials,
        };

        Ok(FittedGridSearch {
            best_estimator,
            summary,
        })
    }
}

/// Result of a grid search: the refit best model plus the score table.
#[derive(Clone, Debug)]
pub struct FittedGridSearch {
    best_estimator: FittedSvc,
    summary: SearchSummary,
}

impl FittedGridSearch {
    /// `(C, gamma)` of the winning candidate.
    pub fn best_params(&self) -> (f64, f64) {
        (self.summary.best_c, self.summary.best_gamma)
    }

    pub fn best_score(&self) -> f64 {
        self.summary.best_score
    }

    pub fn trials(&self) -> &[TrialResult] {
        &self.summary.trials
    }

    pub fn best_estimator(&self) -> &FittedSvc {
        &self.best_estimator
    }

    pub fn summary(&self) -> &SearchSummary {
        &self.summary
    }

    pub fn into_parts(self) -> (FittedSvc, SearchSummary) {
        (self.best_estimator, self.summary)
    }
}

impl InferenceModel for FittedGridSearch {
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        self.best_estimator.predict(x)
    }

    fn n_features_in(&self) -> usize {
        self.best_estimator.n_features_in()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.10, 0.20],
            [0.20, 0.10],
            [0.15, 0.30],
            [0.30, 0.20],
            [0.25, 0.25],
            [0.80, 0.90],
            [0.90, 0.80],
            [0.85, 0.70],
            [0.70, 0.85],
            [0.75, 0.75],
        ];
        (x, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1])
    }

    #[test]
    fn test_linspace_matches_endpoints() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 7.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());

        let axis = linspace(0.01, 10.0, 5);
        assert_eq!(axis.len(), 5);
        assert_eq!(axis[0], 0.01);
        assert_eq!(axis[4], 10.0);
    }

    #[test]
    fn test_positive_only_grid() {
        let grid = ParamGrid::linspace(-10.0, 10.0, 30).positive_only();
        assert_eq!(grid.c.len(), 15);
        assert!(grid.c.iter().all(|&v| v > 0.0));
        assert_eq!(grid.len(), 225);
    }

    #[test]
    fn test_candidates_order() {
        let grid = ParamGrid::new(vec![1.0, 2.0], vec![0.1, 0.2]);
        assert_eq!(
            grid.candidates(),
            vec![(1.0, 0.1), (1.0, 0.2), (2.0, 0.1), (2.0, 0.2)]
        );
    }

    #[test]
    fn test_grid_rejects_non_positive_values() {
        let (x, y) = blobs();
        let search = GridSearch::new(Svc::new(), ParamGrid::new(vec![-1.0, 1.0], vec![0.5]));
        assert!(matches!(
            search.fit(&x, &y),
            Err(ModelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_stratified_k_fold_keeps_class_balance() {
        let y = vec![0, 0, 0, 0, 0, 0, 1, 1, 1];
        let folds = stratified_k_fold(
            &y,
            &CrossValidation {
                n_folds: 3,
                shuffle: true,
                seed: 7,
            },
        )
        .unwrap();

        assert_eq!(folds.len(), 3);
        let mut seen = vec![0usize; y.len()];
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), y.len());
            assert_eq!(test.iter().filter(|&&i| y[i] == 1).count(), 1);
            assert_eq!(test.iter().filter(|&&i| y[i] == 0).count(), 2);
            for &i in test {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_stratified_k_fold_too_few_samples() {
        let y = vec![0, 0, 0, 0, 0, 1, 1];
        let result = stratified_k_fold(&y, &CrossValidation::default());
        assert!(matches!(
            result,
            Err(ModelError::TooFewSamples {
                class: 1,
                count: 2,
                n_folds: 5
            })
        ));
    }

    #[test]
    fn test_grid_search_finds_separating_model() {
        let (x, y) = blobs();
        let search = GridSearch::new(Svc::new(), ParamGrid::new(vec![1.0, 10.0], vec![0.5, 5.0]));
        let fitted = search.fit(&x, &y).unwrap();

        assert_eq!(fitted.trials().len(), 4);
        assert_eq!(fitted.best_score(), 1.0);
        assert_eq!(fitted.predict(&x).unwrap(), y);
        assert_eq!(fitted.n_features_in(), 2);
    }

    #[test]
    fn test_grid_search_tie_break_prefers_grid_order() {
        let (x, y) = blobs();
        let fitted = GridSearch::new(Svc::new(), ParamGrid::new(vec![1.0, 10.0], vec![0.5, 5.0]))
            .fit(&x, &y)
            .unwrap();
        let first_best = fitted
            .trials()
            .iter()
            .find(|t| t.mean_score == fitted.best_score())
            .unwrap();
        assert_eq!(fitted.best_params(), (first_best.c, first_best.gamma));
    }

    #[test]
    fn test_grid_search_is_deterministic() {
        let (x, y) = blobs();
        let search = GridSearch::new(Svc::new(), ParamGrid::linspace(0.5, 5.0, 3)).with_cv(
            CrossValidation {
                n_folds: 5,
                shuffle: true,
                seed: 3,
            },
        );
        let a = search.fit(&x, &y).unwrap();
        let b = search.fit(&x, &y).unwrap();
        assert_eq!(a.summary(), b.summary());
    }
}
