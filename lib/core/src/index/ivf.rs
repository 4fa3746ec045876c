//! Inverted-file index with exact distances inside the probed lists

use super::kmeans::KMeans;
use super::{batch_rows, check_query, Metric, Neighbor, TopK, VectorIndex};
use crate::{Error, Result};

/// Clustered exact index: a k-means coarse quantizer routes every vector to one
/// inverted list, and queries scan the `probe_count` closest lists.
#[derive(Debug, Clone)]
pub struct IvfFlatIndex {
    dim: usize,
    probe_count: usize,
    quantizer: KMeans,
    /// Per list: ids and their vectors, row-major
    lists: Vec<(Vec<usize>, Vec<f32>)>,
    len: usize,
}

impl IvfFlatIndex {
    pub fn new(dim: usize, cluster_count: usize, probe_count: usize) -> Result<Self> {
        if probe_count == 0 || probe_count > cluster_count {
            return Err(Error::Configuration(format!(
                "probe count {} must be in 1..={}",
                probe_count, cluster_count
            )));
        }
        Ok(Self {
            dim,
            probe_count,
            quantizer: KMeans::new(dim, cluster_count)?,
            lists: vec![(Vec::new(), Vec::new()); cluster_count],
            len: 0,
        })
    }

    #[must_use]
    pub fn with_training(mut self, seed: u64, iterations: usize) -> Self {
        self.quantizer = self.quantizer.with_seed(seed).with_iterations(iterations);
        self
    }

    #[inline]
    pub fn probe_count(&self) -> usize {
        self.probe_count
    }

    /// Sizes of the inverted lists
    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(|(ids, _)| ids.len()).collect()
    }
}

impl VectorIndex for IvfFlatIndex {
    fn name(&self) -> &'static str {
        "clustered-flat"
    }

    fn metric(&self) -> Metric {
        Metric::L2
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.len
    }

    fn requires_training(&self) -> bool {
        true
    }

    fn is_trained(&self) -> bool {
        self.quantizer.is_trained()
    }

    fn train(&mut self, vectors: &[f32]) -> Result<()> {
        self.quantizer.fit(vectors)
    }

    fn add(&mut self, vectors: &[f32]) -> Result<()> {
        if !self.is_trained() {
            return Err(Error::IndexBuild(
                "vectors added before the coarse quantizer was trained".to_string(),
            ));
        }
        batch_rows(self.dim, vectors)?;
        for (row, (cluster, _)) in vectors
            .chunks_exact(self.dim)
            .zip(self.quantizer.assign_all(vectors))
        {
            let (ids, data) = &mut self.lists[cluster];
            ids.push(self.len);
            data.extend_from_slice(row);
            self.len += 1;
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        check_query(self.dim, query)?;
        if !self.is_trained() {
            return Err(Error::Query("clustered index is not trained".to_string()));
        }

        let mut top = TopK::new(k.min(self.len), Metric::L2);
        for cluster in self.quantizer.nearest_centroids(query, self.probe_count) {
            let (ids, data) = &self.lists[cluster];
            for (&id, row) in ids.iter().zip(data.chunks_exact(self.dim)) {
                top.push(id, crate::simd::l2_squared_simd(query, row));
            }
        }
        Ok(top.into_neighbors())
    }
}
