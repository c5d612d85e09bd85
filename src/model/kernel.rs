//! Kernel functions for the support-vector classifier.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Kernel family chosen in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    #[default]
    Rbf,
    Linear,
}

/// RBF width: derived from the training data or given explicitly.
///
/// In TOML this is either the string `"scale"` or a positive number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GammaRepr", into = "GammaRepr")]
pub enum Gamma {
    /// `1 / (n_features * var(X))`, or `1.0` for constant `X`.
    #[default]
    Scale,
    Value(f64),
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum GammaName {
    Scale,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum GammaRepr {
    Named(GammaName),
    Value(f64),
}

impl From<GammaRepr> for Gamma {
    fn from(repr: GammaRepr) -> Self {
        match repr {
            GammaRepr::Named(GammaName::Scale) => Gamma::Scale,
            GammaRepr::Value(v) => Gamma::Value(v),
        }
    }
}

impl From<Gamma> for GammaRepr {
    fn from(gamma: Gamma) -> Self {
        match gamma {
            Gamma::Scale => GammaRepr::Named(GammaName::Scale),
            Gamma::Value(v) => GammaRepr::Value(v),
        }
    }
}

impl Gamma {
    /// Concrete gamma for the training matrix `x`.
    pub fn resolve(&self, x: &Array2<f64>) -> f64 {
        match *self {
            Gamma::Value(v) => v,
            Gamma::Scale => {
                let var = if x.is_empty() { 0.0 } else { x.var(0.0) };
                if var > 0.0 {
                    1.0 / (x.ncols() as f64 * var)
                } else {
                    1.0
                }
            }
        }
    }
}

/// A kernel with all parameters resolved.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Kernel {
    /// `exp(-gamma * ||a - b||²)`
    Rbf { gamma: f64 },
    /// `<a, b>`
    Linear,
}

impl Kernel {
    pub fn new(kind: KernelKind, gamma: Gamma, x: &Array2<f64>) -> Self {
        match kind {
            KernelKind::Rbf => Kernel::Rbf {
                gamma: gamma.resolve(x),
            },
            KernelKind::Linear => Kernel::Linear,
        }
    }

    #[inline]
    pub fn compute(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match *self {
            Kernel::Rbf { gamma } => {
                let sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * sq).exp()
            }
            Kernel::Linear => a.dot(&b),
        }
    }

    /// Symmetric kernel matrix over the rows of `x`.
    pub fn gram(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let v = self.compute(x.row(i), x.row(j));
                k[[i, j]] = v;
                k[[j, i]] = v;
            }
        }
        k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_gamma_scale() {
        // var of [0, 1, 0, 1] = 0.25, two features -> 1 / 0.5
        let x = array![[0.0, 1.0], [0.0, 1.0]];
        assert_abs_diff_eq!(Gamma::Scale.resolve(&x), 2.0, epsilon = 1e-12);
        assert_eq!(Gamma::Scale.resolve(&array![[3.0], [3.0]]), 1.0);
        assert_eq!(Gamma::Value(0.1).resolve(&x), 0.1);
    }

    #[test]
    fn test_rbf_kernel() {
        let k = Kernel::Rbf { gamma: 0.5 };
        let a = array![0.0, 0.0];
        let b = array![1.0, 1.0];
        assert_abs_diff_eq!(k.compute(a.view(), b.view()), (-1.0f64).exp(), epsilon = 1e-12);
        assert_eq!(k.compute(a.view(), a.view()), 1.0);
    }

    #[test]
    fn test_gram_is_symmetric() {
        let x = array![[0.0, 1.0], [2.0, 3.0], [4.0, 0.5]];
        let gram = Kernel::Linear.gram(&x);
        assert_eq!(gram, gram.t());
        assert_eq!(gram[[0, 1]], 3.0);
    }

    #[test]
    fn test_gamma_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            gamma: Gamma,
        }
        let scale: Wrapper = toml::from_str("gamma = \"scale\"").unwrap();
        assert_eq!(scale.gamma, Gamma::Scale);
        let value: Wrapper = toml::from_str("gamma = 0.25").unwrap();
        assert_eq!(value.gamma, Gamma::Value(0.25));
    }
}
