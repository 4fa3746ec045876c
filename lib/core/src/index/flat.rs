//! Exact exhaustive-scan index

use super::{batch_rows, check_query, Metric, Neighbor, TopK, VectorIndex};
use crate::Result;

/// Brute-force index over contiguous storage
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Vec<f32>,
    dim: usize,
    metric: Metric,
}

impl FlatIndex {
    pub fn new(dim: usize, metric: Metric) -> Self {
        Self {
            vectors: Vec::new(),
            dim,
            metric,
        }
    }

    pub fn l2(dim: usize) -> Self {
        Self::new(dim, Metric::L2)
    }

    pub fn inner_product(dim: usize) -> Self {
        Self::new(dim, Metric::InnerProduct)
    }
}

impl VectorIndex for FlatIndex {
    fn name(&self) -> &'static str {
        match self.metric {
            Metric::L2 => "flat-l2",
            Metric::InnerProduct => "flat-inner-product",
        }
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.vectors.len() / self.dim
        }
    }

    fn add(&mut self, vectors: &[f32]) -> Result<()> {
        batch_rows(self.dim, vectors)?;
        self.vectors.extend_from_slice(vectors);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        check_query(self.dim, query)?;
        let mut top = TopK::new(k.min(self.len()), self.metric);
        for (id, row) in self.vectors.chunks_exact(self.dim).enumerate() {
            top.push(id, self.metric.score(query, row));
        }
        Ok(top.into_neighbors())
    }
}
