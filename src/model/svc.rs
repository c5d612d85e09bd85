//! Kernel support-vector classifier.
//!
//! The dual problem
//!
//! ```text
//! min  ½ αᵀQα − eᵀα   s.t.  yᵀα = 0,  0 ≤ αᵢ ≤ Cᵢ,   Qᵢⱼ = yᵢ yⱼ K(xᵢ, xⱼ)
//! ```
//!
//! is solved with sequential minimal optimisation using second-order
//! working-set selection, as in libsvm. Class 1 maps to `y = +1`, class 0 to
//! `y = −1`, and each sample's upper bound is `C` times its class weight.
//!
//! # Example
//! ```
//! use mimic_classifier::model::{ClassWeight, InferenceModel, Svc};
//! use ndarray::array;
//!
//! let x = array![[0.0, 0.0], [0.1, 0.2], [0.9, 1.0], [1.0, 0.8]];
//! let y = vec![0, 0, 1, 1];
//! let fitted = Svc::new()
//!     .with_c(10.0)
//!     .with_class_weight(ClassWeight::new(1, 2))
//!     .fit(&x, &y)?;
//! assert_eq!(fitted.predict(&x)?, y);
//! # Ok::<(), mimic_classifier::model::ModelError>(())
//! ```

use super::kernel::{Gamma, Kernel, KernelKind};
use super::{check_training_data, InferenceModel, ModelError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Minimum curvature along a working-set direction.
const TAU: f64 = 1e-12;

/// Integer multipliers on `C` for the negative (0) and positive (1) class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassWeight {
    pub negative: u32,
    pub positive: u32,
}

impl Default for ClassWeight {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl ClassWeight {
    pub fn new(negative: u32, positive: u32) -> Self {
        Self { negative, positive }
    }

    pub fn for_class(&self, class: usize) -> f64 {
        if class == 1 {
            f64::from(self.positive)
        } else {
            f64::from(self.negative)
        }
    }
}

/// Hyperparameters of [`Svc`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvcConfig {
    pub c: f64,
    pub kernel: KernelKind,
    pub gamma: Gamma,
    pub class_weight: ClassWeight,
    /// Stopping tolerance on the maximal KKT violation.
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for SvcConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelKind::Rbf,
            gamma: Gamma::Scale,
            class_weight: ClassWeight::default(),
            tol: 1e-3,
            max_iter: 10_000_000,
        }
    }
}

impl SvcConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "C must be positive, got {}",
                self.c
            )));
        }
        if let Gamma::Value(g) = self.gamma {
            if !(g.is_finite() && g > 0.0) {
                return Err(ModelError::InvalidParameter(format!(
                    "gamma must be positive, got {g}"
                )));
            }
        }
        if self.class_weight.negative == 0 || self.class_weight.positive == 0 {
            return Err(ModelError::InvalidParameter(
                "class weights must be at least 1".to_string(),
            ));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "tol must be positive, got {}",
                self.tol
            )));
        }
        if self.max_iter == 0 {
            return Err(ModelError::InvalidParameter(
                "max_iter must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Support-vector classifier (unfitted).
#[derive(Clone, Debug, Default)]
pub struct Svc {
    config: SvcConfig,
}

impl Svc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: SvcConfig) -> Self {
        Self { config }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    pub fn with_kernel(mut self, kernel: KernelKind) -> Self {
        self.config.kernel = kernel;
        self
    }

    pub fn with_gamma(mut self, gamma: Gamma) -> Self {
        self.config.gamma = gamma;
        self
    }

    pub fn with_class_weight(mut self, weight: ClassWeight) -> Self {
        self.config.class_weight = weight;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    pub fn config(&self) -> &SvcConfig {
        &self.config
    }

    /// Fit on features `x` and 0/1 labels `y`.
    ///
    /// # Errors
    /// Invalid hyperparameters, empty or non-finite input, labels other than
    /// 0/1, a single class, or mismatched lengths.
    pub fn fit(&self, x: &Array2<f64>, y: &[usize]) -> Result<FittedSvc, ModelError> {
        self.config.validate()?;
        check_training_data(x, y)?;

        let kernel = Kernel::new(self.config.kernel, self.config.gamma, x);
        let signs: Vec<f64> = y.iter().map(|&c| if c == 1 { 1.0 } else { -1.0 }).collect();
        let bounds: Vec<f64> = y
            .iter()
            .map(|&c| self.config.c * self.config.class_weight.for_class(c))
            .collect();

        let solution = Smo {
            gram: kernel.gram(x),
            y: &signs,
            bounds: &bounds,
            tol: self.config.tol,
            max_iter: self.config.max_iter,
        }
        .solve();

        if !solution.converged {
            log::warn!(
                "SMO stopped after max_iter={} iterations without converging",
                self.config.max_iter
            );
        }

        let support: Vec<usize> = solution
            .alpha
            .iter()
            .enumerate()
            .filter(|&(_, &a)| a > 0.0)
            .map(|(i, _)| i)
            .collect();
        let dual_coef: Vec<f64> = support
            .iter()
            .map(|&i| solution.alpha[i] * signs[i])
            .collect();
        let n_support = [
            support.iter().filter(|&&i| y[i] == 0).count(),
            support.iter().filter(|&&i| y[i] == 1).count(),
        ];

        log::debug!(
            "SVC fitted: C={}, kernel={:?}, {} iterations, {} support vectors",
            self.config.c,
            kernel,
            solution.iterations,
            support.len()
        );

        Ok(FittedSvc {
            kernel,
            c: self.config.c,
            class_weight: self.config.class_weight,
            support_vectors: x.select(Axis(0), &support),
            dual_coef: Array1::from(dual_coef),
            rho: solution.rho,
            n_support,
            n_iter: solution.iterations,
        })
    }
}

struct Solution {
    alpha: Vec<f64>,
    rho: f64,
    iterations: usize,
    converged: bool,
}

struct Smo<'a> {
    gram: Array2<f64>,
    y: &'a [f64],
    bounds: &'a [f64],
    tol: f64,
    max_iter: usize,
}

impl Smo<'_> {
    fn solve(&self) -> Solution {
        let n = self.y.len();
        let mut alpha = vec![0.0; n];
        // Gradient of the dual objective; α = 0 gives −e.
        let mut grad = vec![-1.0; n];

        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.max_iter {
            let Some((i, j)) = self.select_working_set(&alpha, &grad) else {
                converged = true;
                break;
            };
            iterations += 1;

            let (old_ai, old_aj) = (alpha[i], alpha[j]);
            self.update_pair(i, j, &mut alpha, &grad);

            let (dai, daj) = (alpha[i] - old_ai, alpha[j] - old_aj);
            for (t, g) in grad.iter_mut().enumerate() {
                *g += self.y[t]
                    * (self.y[i] * self.gram[[t, i]] * dai + self.y[j] * self.gram[[t, j]] * daj);
            }
        }

        let rho = self.rho(&alpha, &grad);
        Solution {
            alpha,
            rho,
            iterations,
            converged,
        }
    }

    fn is_upper(&self, alpha: &[f64], t: usize) -> bool {
        alpha[t] >= self.bounds[t]
    }

    fn is_lower(alpha: &[f64], t: usize) -> bool {
        alpha[t] <= 0.0
    }

    fn curvature(&self, i: usize, j: usize) -> f64 {
        let quad = self.gram[[i, i]] + self.gram[[j, j]] - 2.0 * self.gram[[i, j]];
        if quad > 0.0 {
            quad
        } else {
            TAU
        }
    }

    /// Maximal violating pair with second-order selection of `j`; `None` at optimum.
    fn select_working_set(&self, alpha: &[f64], grad: &[f64]) -> Option<(usize, usize)> {
        let mut gmax = f64::NEG_INFINITY;
        let mut gmax_idx = None;
        for t in 0..self.y.len() {
            let candidate = if self.y[t] > 0.0 {
                (!self.is_upper(alpha, t)).then(|| -grad[t])
            } else {
                (!Self::is_lower(alpha, t)).then(|| grad[t])
            };
            if let Some(v) = candidate {
                if v >= gmax {
                    gmax = v;
                    gmax_idx = Some(t);
                }
            }
        }
        let i = gmax_idx?;

        let mut gmax2 = f64::NEG_INFINITY;
        let mut best_j = None;
        let mut obj_min = f64::INFINITY;
        for t in 0..self.y.len() {
            let violation = if self.y[t] > 0.0 {
                (!Self::is_lower(alpha, t)).then(|| grad[t])
            } else {
                (!self.is_upper(alpha, t)).then(|| -grad[t])
            };
            let Some(v) = violation else { continue };
            gmax2 = gmax2.max(v);

            let grad_diff = gmax + v;
            if grad_diff > 0.0 {
                let obj = -(grad_diff * grad_diff) / self.curvature(i, t);
                if obj <= obj_min {
                    obj_min = obj;
                    best_j = Some(t);
                }
            }
        }

        if gmax + gmax2 < self.tol {
            return None;
        }
        best_j.map(|j| (i, j))
    }

    /// Analytic two-variable update with clipping to the box.
    fn update_pair(&self, i: usize, j: usize, alpha: &mut [f64], grad: &[f64]) {
        let (ci, cj) = (self.bounds[i], self.bounds[j]);
        let quad = self.curvature(i, j);

        if self.y[i] != self.y[j] {
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;

            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > ci - cj {
                if alpha[i] > ci {
                    alpha[i] = ci;
                    alpha[j] = ci - diff;
                }
            } else if alpha[j] > cj {
                alpha[j] = cj;
                alpha[i] = cj + diff;
            }
        } else {
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;

            if sum > ci {
                if alpha[i] > ci {
                    alpha[i] = ci;
                    alpha[j] = sum - ci;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > cj {
                if alpha[j] > cj {
                    alpha[j] = cj;
                    alpha[i] = sum - cj;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }
    }

    fn rho(&self, alpha: &[f64], grad: &[f64]) -> f64 {
        let mut ub = f64::INFINITY;
        let mut lb = f64::NEG_INFINITY;
        let mut free_sum = 0.0;
        let mut n_free = 0usize;

        for t in 0..self.y.len() {
            let yg = self.y[t] * grad[t];
            if self.is_upper(alpha, t) {
                if self.y[t] < 0.0 {
                    ub = ub.min(yg);
                } else {
                    lb = lb.max(yg);
                }
            } else if Self::is_lower(alpha, t) {
                if self.y[t] > 0.0 {
                    ub = ub.min(yg);
                } else {
                    lb = lb.max(yg);
                }
            } else {
                n_free += 1;
                free_sum += yg;
            }
        }

        if n_free > 0 {
            free_sum / n_free as f64
        } else {
            (ub + lb) / 2.0
        }
    }
}

/// Serializable parameters for a [`FittedSvc`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SvcParams {
    pub kernel: Kernel,
    pub c: f64,
    pub class_weight: ClassWeight,
    /// Support vectors, row-major.
    pub support_vectors: Vec<f64>,
    pub n_features: usize,
    /// `αᵢ yᵢ` for every support vector.
    pub dual_coef: Vec<f64>,
    pub rho: f64,
    pub n_support: [usize; 2],
    pub n_iter: usize,
}

/// Fitted support-vector classifier.
#[derive(Clone, Debug)]
pub struct FittedSvc {
    kernel: Kernel,
    c: f64,
    class_weight: ClassWeight,
    support_vectors: Array2<f64>,
    dual_coef: Array1<f64>,
    rho: f64,
    n_support: [usize; 2],
    n_iter: usize,
}

impl FittedSvc {
    /// Signed distance to the separating surface; positive means class 1.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        self.check_width(x.ncols())?;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| self.decision_row(row))
            .collect())
    }

    fn decision_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.support_vectors
            .rows()
            .into_iter()
            .zip(self.dual_coef.iter())
            .map(|(sv, &coef)| coef * self.kernel.compute(sv, row))
            .sum::<f64>()
            - self.rho
    }

    fn check_width(&self, cols: usize) -> Result<(), ModelError> {
        if cols != self.support_vectors.ncols() {
            return Err(ModelError::FeatureMismatch {
                expected_features: self.support_vectors.ncols(),
                got_features: cols,
            });
        }
        Ok(())
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn class_weight(&self) -> ClassWeight {
        self.class_weight
    }

    pub fn support_vectors(&self) -> &Array2<f64> {
        &self.support_vectors
    }

    /// Support-vector counts for class 0 and class 1.
    pub fn n_support(&self) -> [usize; 2] {
        self.n_support
    }

    pub fn intercept(&self) -> f64 {
        -self.rho
    }

    /// SMO iterations used during fit.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn extract_params(&self) -> SvcParams {
        SvcParams {
            kernel: self.kernel,
            c: self.c,
            class_weight: self.class_weight,
            support_vectors: self.support_vectors.iter().copied().collect(),
            n_features: self.support_vectors.ncols(),
            dual_coef: self.dual_coef.to_vec(),
            rho: self.rho,
            n_support: self.n_support,
            n_iter: self.n_iter,
        }
    }

    pub fn from_params(params: SvcParams) -> Result<Self, ModelError> {
        let n_sv = params.dual_coef.len();
        if params.n_support[0] + params.n_support[1] != n_sv {
            return Err(ModelError::InvalidParameter(format!(
                "{} dual coefficients for {:?} support vectors",
                n_sv, params.n_support
            )));
        }
        if !params.rho.is_finite() || params.dual_coef.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::NonFinite);
        }
        if let Kernel::Rbf { gamma } = params.kernel {
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(ModelError::InvalidParameter(format!(
                    "gamma must be positive, got {gamma}"
                )));
            }
        }
        let support_vectors =
            Array2::from_shape_vec((n_sv, params.n_features), params.support_vectors)
                .map_err(|e| ModelError::InvalidParameter(e.to_string()))?;

        Ok(Self {
            kernel: params.kernel,
            c: params.c,
            class_weight: params.class_weight,
            support_vectors,
            dual_coef: Array1::from(params.dual_coef),
            rho: params.rho,
            n_support: params.n_support,
            n_iter: params.n_iter,
        })
    }
}

impl InferenceModel for FittedSvc {
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        Ok(self
            .decision_function(x)?
            .iter()
            .map(|&d| usize::from(d > 0.0))
            .collect())
    }

    fn n_features_in(&self) -> usize {
        self.support_vectors.ncols()
    }
}
