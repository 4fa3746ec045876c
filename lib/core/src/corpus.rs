//! Embedded corpus
//!
//! The row-major f32 matrix that every index and scorer works on. Row `i` is the
//! embedding of item `i` of the source table; nothing downstream reorders rows.

use crate::{Error, Result, Vector};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Fingerprint of the embedding space a corpus lives in.
///
/// Corpora produced by the same fitted reducer share a `SpaceId`; vectors from
/// different spaces must never be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceId(u64);

impl SpaceId {
    #[inline]
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Fingerprint of raw f32 data. Used for corpora that were not produced by a reducer.
    pub fn of_data(data: &[f32], dim: usize) -> Self {
        let mut hasher = DefaultHasher::new();
        dim.hash(&mut hasher);
        for x in data {
            x.to_bits().hash(&mut hasher);
        }
        Self(hasher.finish())
    }

    /// Derive a child space, e.g. the L2-normalized view of a corpus
    #[must_use]
    pub fn derive(self, tag: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        tag.hash(&mut hasher);
        Self(hasher.finish())
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Immutable matrix of item embeddings
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedCorpus {
    data: Vec<f32>,
    dim: usize,
    space: SpaceId,
}

impl EmbeddedCorpus {
    /// Build a corpus from row-major data; the space id is a fingerprint of the data.
    pub fn new(data: Vec<f32>, dim: usize) -> Result<Self> {
        let space = SpaceId::of_data(&data, dim);
        Self::with_space(data, dim, space)
    }

    /// Build a corpus that belongs to an explicit embedding space
    pub fn with_space(data: Vec<f32>, dim: usize, space: SpaceId) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Configuration(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }
        if data.len() % dim != 0 {
            return Err(Error::InvalidRequest(format!(
                "{} values do not split into rows of {} components",
                data.len(),
                dim
            )));
        }
        if let Some(pos) = data.iter().position(|x| !x.is_finite()) {
            return Err(Error::Data {
                row: pos / dim,
                column: format!("component {}", pos % dim),
                reason: "embedding value is not finite".to_string(),
            });
        }
        Ok(Self { data, dim, space })
    }

    /// Build a corpus from individual rows, which must all share one length
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(data, dim)
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn space(&self) -> SpaceId {
        self.space
    }

    /// All rows as one contiguous slice
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Embedding of item `id`
    #[inline]
    pub fn row(&self, id: usize) -> Option<&[f32]> {
        let start = id.checked_mul(self.dim)?;
        let end = start.checked_add(self.dim)?;
        self.data.get(start..end)
    }

    pub fn vector(&self, id: usize) -> Option<Vector> {
        self.row(id).map(Vector::from_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dim)
    }

    /// Copy of the corpus with every row scaled to unit length.
    ///
    /// Zero rows stay zero. The copy lives in a derived space, so it is never
    /// mistaken for the raw embedding.
    #[must_use]
    pub fn l2_normalized(&self) -> Self {
        let mut data = self.data.clone();
        for row in data.chunks_exact_mut(self.dim) {
            crate::vector::normalize_in_place(row);
        }
        Self {
            data,
            dim: self.dim,
            space: self.space.derive("l2-normalized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_len() {
        let corpus = EmbeddedCorpus::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2).unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(corpus.row(3), None);
        assert_eq!(corpus.rows().count(), 3);
    }

    #[test]
    fn test_row_out_of_range_ids() {
        let corpus = EmbeddedCorpus::new(vec![1.0, 2.0, 3.0], 1).unwrap();
        assert_eq!(corpus.row(2), Some(&[3.0][..]));
        assert_eq!(corpus.row(usize::MAX), None);
        assert_eq!(corpus.row(usize::MAX / 2 + 1), None);
        assert!(corpus.vector(usize::MAX).is_none());
    }

    #[test]
    fn test_rejects_ragged_data() {
        assert!(matches!(
            EmbeddedCorpus::new(vec![1.0, 2.0, 3.0], 2),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            EmbeddedCorpus::from_rows(&[vec![1.0, 2.0], vec![1.0]]),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            EmbeddedCorpus::new(vec![1.0, f32::NAN], 2),
            Err(Error::Data { row: 0, .. })
        ));
    }

    #[test]
    fn test_space_fingerprint() {
        let a = EmbeddedCorpus::new(vec![1.0, 2.0], 2).unwrap();
        let b = EmbeddedCorpus::new(vec![1.0, 2.0], 2).unwrap();
        let c = EmbeddedCorpus::new(vec![1.0, 2.5], 2).unwrap();
        assert_eq!(a.space(), b.space());
        assert_ne!(a.space(), c.space());
        assert_ne!(a.space(), a.l2_normalized().space());
    }

    #[test]
    fn test_l2_normalized() {
        let corpus = EmbeddedCorpus::new(vec![3.0, 4.0, 0.0, 0.0], 2).unwrap();
        let normalized = corpus.l2_normalized();
        let first = normalized.row(0).unwrap();
        assert!((first[0] - 0.6).abs() < 1e-6);
        assert_eq!(normalized.row(1).unwrap(), &[0.0, 0.0]);
    }
}
