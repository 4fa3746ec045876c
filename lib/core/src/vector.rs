use serde::{Deserialize, Serialize};

/// A dense embedding vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }
}

/// L2-normalize a slice in place; near-zero slices are left untouched
#[inline]
pub fn normalize_in_place(data: &mut [f32]) {
    let norm = crate::simd::norm_simd(data);
    if norm > f32::EPSILON {
        let inv_norm = 1.0 / norm;
        for x in data {
            *x *= inv_norm;
        }
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_in_place() {
        let mut v = vec![3.0, 4.0];
        normalize_in_place(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize_in_place(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_vector_accessors() {
        let v = Vector::from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(v.dim(), 3);
        assert!(!v.is_empty());
        assert_eq!(v.clone().into_inner(), vec![1.0, 2.0, 3.0]);
        assert_eq!(Vector::from(vec![1.0, 2.0, 3.0]), v);
    }
}
