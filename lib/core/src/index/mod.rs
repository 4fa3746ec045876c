//! Nearest-neighbor index strategies
//!
//! Every strategy implements [`VectorIndex`]: an optional training pass, bulk
//! insertion of row-major vectors, and k-nearest-neighbor search by vector.
//! Insertion order defines identity: the i-th inserted row is id `i`.

pub mod flat;
pub mod hnsw;
pub mod ivf;
pub mod ivf_pq;
pub mod kmeans;
pub mod pq;

use crate::{Error, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BinaryHeap;

pub use flat::FlatIndex;
pub use hnsw::HnswIndex;
pub use ivf::IvfFlatIndex;
pub use ivf_pq::IvfPqIndex;
pub use kmeans::KMeans;
pub use pq::ProductQuantizer;

/// How an index scores a candidate against a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Squared Euclidean distance, smaller is closer
    L2,
    /// Dot product, larger is closer
    InnerProduct,
}

impl Metric {
    #[inline]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::L2 => crate::simd::l2_squared_simd(a, b),
            Metric::InnerProduct => crate::simd::dot_product_simd(a, b),
        }
    }

    /// Map a score onto "smaller is better"
    #[inline]
    fn rank_key(self, score: f32) -> f32 {
        match self {
            Metric::L2 => score,
            Metric::InnerProduct => -score,
        }
    }
}

/// One search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: usize,
    /// Score under the index metric (squared L2 or dot product)
    pub distance: f32,
}

/// The capability every index strategy exposes
pub trait VectorIndex: Send + Sync {
    /// Strategy name, for logs
    fn name(&self) -> &'static str;

    fn metric(&self) -> Metric;

    fn dim(&self) -> usize;

    /// Number of inserted vectors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn requires_training(&self) -> bool {
        false
    }

    fn is_trained(&self) -> bool {
        true
    }

    /// Learn index structure from row-major vectors
    fn train(&mut self, _vectors: &[f32]) -> Result<()> {
        Ok(())
    }

    /// Append row-major vectors; ids continue from `len()`
    fn add(&mut self, vectors: &[f32]) -> Result<()>;

    /// Up to `k` neighbors of `query`, best first, equal scores by smaller id
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}

/// Reject a query whose length does not match the index
pub(crate) fn check_query(dim: usize, query: &[f32]) -> Result<()> {
    if query.len() != dim {
        return Err(Error::Query(format!(
            "query has {} dimensions, index has {}",
            query.len(),
            dim
        )));
    }
    Ok(())
}

/// Number of rows in a row-major batch, or a dimension error
pub(crate) fn batch_rows(dim: usize, vectors: &[f32]) -> Result<usize> {
    if dim == 0 || vectors.len() % dim != 0 {
        return Err(Error::DimensionMismatch {
            expected: dim,
            actual: if dim == 0 { vectors.len() } else { vectors.len() % dim },
        });
    }
    Ok(vectors.len() / dim)
}

/// Bounded collector for the best `k` candidates
pub(crate) struct TopK {
    k: usize,
    metric: Metric,
    // Max-heap on (rank key, id): the root is the current worst hit
    heap: BinaryHeap<(OrderedFloat<f32>, usize)>,
}

impl TopK {
    pub(crate) fn new(k: usize, metric: Metric) -> Self {
        Self {
            k,
            metric,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, id: usize, score: f32) {
        if self.k == 0 {
            return;
        }
        let entry = (OrderedFloat(self.metric.rank_key(score)), id);
        if self.heap.len() < self.k {
            self.heap.push(entry);
        } else if let Some(worst) = self.heap.peek() {
            if entry < *worst {
                self.heap.pop();
                self.heap.push(entry);
            }
        }
    }

    pub(crate) fn into_neighbors(self) -> Vec<Neighbor> {
        let metric = self.metric;
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|(key, id)| Neighbor {
                id,
                distance: metric.rank_key(key.into_inner()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topk_l2_keeps_smallest() {
        let mut top = TopK::new(2, Metric::L2);
        for (id, d) in [(0, 3.0), (1, 1.0), (2, 2.0), (3, 0.5)] {
            top.push(id, d);
        }
        let ids: Vec<usize> = top.into_neighbors().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_topk_inner_product_keeps_largest() {
        let mut top = TopK::new(2, Metric::InnerProduct);
        for (id, s) in [(0, 0.1), (1, 0.9), (2, 0.5)] {
            top.push(id, s);
        }
        let hits = top.into_neighbors();
        assert_eq!(hits[0].id, 1);
        assert!((hits[0].distance - 0.9).abs() < 1e-6);
        assert_eq!(hits[1].id, 2);
    }

    #[test]
    fn test_topk_ties_prefer_smaller_id() {
        let mut top = TopK::new(2, Metric::L2);
        for id in [5, 2, 9, 1] {
            top.push(id, 1.0);
        }
        let ids: Vec<usize> = top.into_neighbors().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
