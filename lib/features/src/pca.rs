//! Principal component analysis
//!
//! Covariance eigendecomposition with the cyclic Jacobi method. Feature
//! counts are small (tens of columns), so the dense O(d^3) sweep is cheap
//! and fully deterministic.

use serde::{Deserialize, Serialize};

const MAX_SWEEPS: usize = 100;
const CONVERGENCE_EPS: f64 = 1e-24;

/// Eigen-decomposition of a symmetric `dim x dim` matrix (row-major).
///
/// Returns eigenvalues and the eigenvector matrix; column `j` of the
/// vectors pairs with eigenvalue `j`. Order is unspecified.
pub fn symmetric_eigen(matrix: &[f64], dim: usize) -> (Vec<f64>, Vec<f64>) {
    let mut a = matrix.to_vec();
    let mut v = vec![0.0; dim * dim];
    for i in 0..dim {
        v[i * dim + i] = 1.0;
    }

    let scale: f64 = a.iter().map(|x| x * x).sum::<f64>().max(f64::MIN_POSITIVE);

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..dim {
            for q in (p + 1)..dim {
                off += a[p * dim + q] * a[p * dim + q];
            }
        }
        if off <= CONVERGENCE_EPS * scale {
            break;
        }

        for p in 0..dim {
            for q in (p + 1)..dim {
                let apq = a[p * dim + q];
                if apq == 0.0 {
                    continue;
                }
                let app = a[p * dim + p];
                let aqq = a[q * dim + q];

                let theta = (aqq - app) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                // A <- A J
                for k in 0..dim {
                    let akp = a[k * dim + p];
                    let akq = a[k * dim + q];
                    a[k * dim + p] = c * akp - s * akq;
                    a[k * dim + q] = s * akp + c * akq;
                }
                // A <- J^T A
                for k in 0..dim {
                    let apk = a[p * dim + k];
                    let aqk = a[q * dim + k];
                    a[p * dim + k] = c * apk - s * aqk;
                    a[q * dim + k] = s * apk + c * aqk;
                }
                // V <- V J
                for k in 0..dim {
                    let vkp = v[k * dim + p];
                    let vkq = v[k * dim + q];
                    v[k * dim + p] = c * vkp - s * vkq;
                    v[k * dim + q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let values = (0..dim).map(|i| a[i * dim + i]).collect();
    (values, v)
}

/// Fitted projection onto the leading principal components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    input_dim: usize,
    mean: Vec<f64>,
    /// `n_components x input_dim`, row-major, unit length
    components: Vec<f64>,
    explained_variance: Vec<f64>,
    total_variance: f64,
}

impl Pca {
    /// Fit `n_components` components on `n x dim` row-major data.
    ///
    /// Components are ordered by descending eigenvalue (ties by original
    /// position) and each is signed so its largest-magnitude loading is
    /// positive.
    pub fn fit(data: &[f64], dim: usize, n_components: usize) -> Self {
        let n = if dim == 0 { 0 } else { data.len() / dim };
        let n_components = n_components.min(dim);

        let mut mean = vec![0.0; dim];
        if n > 0 {
            for row in data.chunks_exact(dim) {
                for (m, &x) in mean.iter_mut().zip(row) {
                    *m += x;
                }
            }
            for m in &mut mean {
                *m /= n as f64;
            }
        }

        let mut cov = vec![0.0; dim * dim];
        let mut centered = vec![0.0; dim];
        for row in data.chunks_exact(dim.max(1)).take(n) {
            for ((c, &x), &m) in centered.iter_mut().zip(row).zip(&mean) {
                *c = x - m;
            }
            for i in 0..dim {
                for j in i..dim {
                    cov[i * dim + j] += centered[i] * centered[j];
                }
            }
        }
        let denom = n.saturating_sub(1).max(1) as f64;
        for i in 0..dim {
            for j in i..dim {
                let value = cov[i * dim + j] / denom;
                cov[i * dim + j] = value;
                cov[j * dim + i] = value;
            }
        }

        let (values, vectors) = symmetric_eigen(&cov, dim);
        let total_variance: f64 = values.iter().map(|v| v.max(0.0)).sum();

        let mut order: Vec<usize> = (0..dim).collect();
        order.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));

        let mut components = Vec::with_capacity(n_components * dim);
        let mut explained_variance = Vec::with_capacity(n_components);
        for &col in order.iter().take(n_components) {
            let mut axis: Vec<f64> = (0..dim).map(|row| vectors[row * dim + col]).collect();

            let mut pivot = 0;
            for (i, x) in axis.iter().enumerate() {
                if x.abs() > axis[pivot].abs() {
                    pivot = i;
                }
            }
            if axis[pivot] < 0.0 {
                for x in &mut axis {
                    *x = -*x;
                }
            }

            components.extend_from_slice(&axis);
            explained_variance.push(values[col].max(0.0));
        }

        Self {
            input_dim: dim,
            mean,
            components,
            explained_variance,
            total_variance,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn n_components(&self) -> usize {
        self.explained_variance.len()
    }

    /// Unit axis of component `i`
    pub fn component(&self, i: usize) -> Option<&[f64]> {
        let d = self.input_dim;
        self.components.get(i * d..(i + 1) * d)
    }

    pub fn components(&self) -> &[f64] {
        &self.components
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    /// Share of total variance per kept component; zeros when the data has none
    pub fn explained_variance_ratio(&self) -> Vec<f64> {
        if self.total_variance <= 0.0 {
            return vec![0.0; self.explained_variance.len()];
        }
        self.explained_variance
            .iter()
            .map(|v| v / self.total_variance)
            .collect()
    }

    /// Project one row onto the kept components
    pub fn project(&self, row: &[f64]) -> Vec<f64> {
        (0..self.n_components())
            .map(|c| {
                let axis = &self.components[c * self.input_dim..(c + 1) * self.input_dim];
                axis.iter()
                    .zip(row)
                    .zip(&self.mean)
                    .map(|((w, x), m)| w * (x - m))
                    .sum()
            })
            .collect()
    }
}
