//! Per-column standardization

use serde::{Deserialize, Serialize};

/// Columns whose population standard deviation falls below this are constant
const MIN_SCALE: f64 = 1e-12;

/// Zero-mean, unit-variance scaling fitted on a row-major matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    /// Population standard deviation, or 0.0 for a constant column
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on `n x dim` data. An empty matrix yields zero means and scales.
    pub fn fit(data: &[f64], dim: usize) -> Self {
        let n = if dim == 0 { 0 } else { data.len() / dim };
        let mut means = vec![0.0; dim];
        let mut scales = vec![0.0; dim];
        if n == 0 {
            return Self { means, scales };
        }

        for row in data.chunks_exact(dim) {
            for (m, &x) in means.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut means {
            *m /= n as f64;
        }

        for row in data.chunks_exact(dim) {
            for ((s, &m), &x) in scales.iter_mut().zip(&means).zip(row) {
                let d = x - m;
                *s += d * d;
            }
        }
        for s in &mut scales {
            let std = (*s / n as f64).sqrt();
            *s = if std.is_finite() && std > MIN_SCALE { std } else { 0.0 };
        }

        Self { means, scales }
    }

    pub fn dim(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Indices of columns with no variance in the fitted data
    pub fn constant_columns(&self) -> Vec<usize> {
        self.scales
            .iter()
            .enumerate()
            .filter(|(_, &s)| s == 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Standardize one row in place; constant columns become 0.0
    pub fn transform_row(&self, row: &mut [f64]) {
        for ((x, &m), &s) in row.iter_mut().zip(&self.means).zip(&self.scales) {
            *x = if s == 0.0 { 0.0 } else { (*x - m) / s };
        }
    }

    pub fn transform(&self, data: &mut [f64]) {
        let dim = self.dim();
        if dim == 0 {
            return;
        }
        for row in data.chunks_exact_mut(dim) {
            self.transform_row(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_statistics() {
        // column 0: 1, 2, 3 -> mean 2, population std sqrt(2/3)
        let data = vec![1.0, 10.0, 2.0, 10.0, 3.0, 10.0];
        let scaler = StandardScaler::fit(&data, 2);
        assert_eq!(scaler.means(), &[2.0, 10.0]);
        assert!((scaler.scales()[0] - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(scaler.scales()[1], 0.0);
        assert_eq!(scaler.constant_columns(), vec![1]);
    }

    #[test]
    fn test_transform_zero_mean_unit_variance() {
        let mut data = vec![1.0, 5.0, 2.0, 7.0, 3.0, 9.0, 4.0, 11.0];
        let scaler = StandardScaler::fit(&data, 2);
        scaler.transform(&mut data);

        for col in 0..2 {
            let values: Vec<f64> = data.iter().skip(col).step_by(2).copied().collect();
            let mean = values.iter().sum::<f64>() / 4.0;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let mut data = vec![3.0, 1.0, 3.0, 2.0];
        let scaler = StandardScaler::fit(&data, 2);
        scaler.transform(&mut data);
        assert_eq!(data[0], 0.0);
        assert_eq!(data[2], 0.0);
        assert!(data.iter().all(|x| x.is_finite()));
    }
}
