//! Inverted-file index over product-quantized residuals

use super::kmeans::KMeans;
use super::pq::ProductQuantizer;
use super::{batch_rows, check_query, Metric, Neighbor, TopK, VectorIndex};
use crate::{Error, Result};

/// Inverted list: ids plus one code sequence per id (stride = segment count)
#[derive(Debug, Clone, Default)]
struct InvertedList {
    ids: Vec<usize>,
    codes: Vec<u8>,
}

/// Clustered quantized index.
///
/// Each vector is routed to its nearest coarse centroid and the residual
/// (vector minus centroid) is product-quantized. Reported distances are the
/// quantized squared L2 distances, so rankings are approximate.
#[derive(Debug, Clone)]
pub struct IvfPqIndex {
    dim: usize,
    probe_count: usize,
    seed: u64,
    iterations: usize,
    quantizer: KMeans,
    pq: ProductQuantizer,
    lists: Vec<InvertedList>,
    len: usize,
}

impl IvfPqIndex {
    pub fn new(
        dim: usize,
        cluster_count: usize,
        probe_count: usize,
        segment_count: usize,
        bits_per_code: u32,
    ) -> Result<Self> {
        if probe_count == 0 || probe_count > cluster_count {
            return Err(Error::Configuration(format!(
                "probe count {} must be in 1..={}",
                probe_count, cluster_count
            )));
        }
        Ok(Self {
            dim,
            probe_count,
            seed: crate::config::DEFAULT_SEED,
            iterations: crate::config::DEFAULT_KMEANS_ITERATIONS,
            quantizer: KMeans::new(dim, cluster_count)?,
            pq: ProductQuantizer::new(dim, segment_count, bits_per_code)?,
            lists: vec![InvertedList::default(); cluster_count],
            len: 0,
        })
    }

    #[must_use]
    pub fn with_training(mut self, seed: u64, iterations: usize) -> Self {
        self.seed = seed;
        self.iterations = iterations;
        self.quantizer = self.quantizer.with_seed(seed).with_iterations(iterations);
        self
    }

    #[inline]
    pub fn probe_count(&self) -> usize {
        self.probe_count
    }

    fn residual(&self, vector: &[f32], cluster: usize) -> Vec<f32> {
        vector
            .iter()
            .zip(self.quantizer.centroid(cluster))
            .map(|(x, c)| x - c)
            .collect()
    }
}

impl VectorIndex for IvfPqIndex {
    fn name(&self) -> &'static str {
        "clustered-quantized"
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
        self.quantizer.is_trained() && self.pq.is_trained()
    }

    fn train(&mut self, vectors: &[f32]) -> Result<()> {
        batch_rows(self.dim, vectors)?;
        self.quantizer.fit(vectors)?;

        let mut residuals = Vec::with_capacity(vectors.len());
        for (row, (cluster, _)) in vectors
            .chunks_exact(self.dim)
            .zip(self.quantizer.assign_all(vectors))
        {
            residuals.extend(self.residual(row, cluster));
        }
        self.pq
            .fit(&residuals, self.seed.wrapping_add(1), self.iterations)
    }

    fn add(&mut self, vectors: &[f32]) -> Result<()> {
        if !self.is_trained() {
            return Err(Error::IndexBuild(
                "vectors added before the quantizers were trained".to_string(),
            ));
        }
        batch_rows(self.dim, vectors)?;
        for (row, (cluster, _)) in vectors
            .chunks_exact(self.dim)
            .zip(self.quantizer.assign_all(vectors))
        {
            let codes = self.pq.encode(&self.residual(row, cluster));
            let list = &mut self.lists[cluster];
            list.ids.push(self.len);
            list.codes.extend_from_slice(&codes);
            self.len += 1;
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        check_query(self.dim, query)?;
        if !self.is_trained() {
            return Err(Error::Query("clustered index is not trained".to_string()));
        }

        let stride = self.pq.segments();
        let mut top = TopK::new(k.min(self.len), Metric::L2);
        for cluster in self.quantizer.nearest_centroids(query, self.probe_count) {
            let list = &self.lists[cluster];
            if list.ids.is_empty() {
                continue;
            }
            let table = self.pq.distance_table(&self.residual(query, cluster));
            for (&id, codes) in list.ids.iter().zip(list.codes.chunks_exact(stride)) {
                top.push(id, self.pq.distance_with_table(&table, codes));
            }
        }
        Ok(top.into_neighbors())
    }
}
