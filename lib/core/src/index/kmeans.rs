//! k-means clustering
//!
//! Used for the coarse quantizer of the clustered strategies and for the
//! per-segment codebooks of the product quantizer. Distances are squared L2.

use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Seeded k-means with k-means++ initialization and Lloyd refinement
#[derive(Debug, Clone)]
pub struct KMeans {
    dim: usize,
    k: usize,
    iterations: usize,
    seed: u64,
    /// k x dim, row-major
    centroids: Vec<f32>,
}

impl KMeans {
    pub fn new(dim: usize, k: usize) -> Result<Self> {
        if dim == 0 || k == 0 {
            return Err(Error::IndexBuild(
                "k-means needs a non-zero dimension and cluster count".to_string(),
            ));
        }
        Ok(Self {
            dim,
            k,
            iterations: crate::config::DEFAULT_KMEANS_ITERATIONS,
            seed: crate::config::DEFAULT_SEED,
            centroids: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    #[inline]
    pub fn centroid(&self, cluster: usize) -> &[f32] {
        &self.centroids[cluster * self.dim..(cluster + 1) * self.dim]
    }

    /// Train on row-major vectors. Needs at least `k` vectors.
    pub fn fit(&mut self, vectors: &[f32]) -> Result<()> {
        let n = super::batch_rows(self.dim, vectors)?;
        if n < self.k {
            return Err(Error::IndexBuild(format!(
                "{} training vectors cannot seed {} clusters",
                n, self.k
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        self.centroids = self.kmeans_plus_plus(vectors, n, &mut rng);

        let mut previous: Vec<usize> = Vec::new();
        for iteration in 0..self.iterations {
            let assignments = self.assign_all(vectors);
            let labels: Vec<usize> = assignments.iter().map(|&(c, _)| c).collect();
            if labels == previous {
                tracing::trace!(iteration, k = self.k, "k-means converged");
                break;
            }
            self.update_centroids(vectors, &assignments);
            previous = labels;
        }

        Ok(())
    }

    /// Nearest centroid and its squared distance
    pub fn assign(&self, vector: &[f32]) -> (usize, f32) {
        let mut best = (0usize, f32::INFINITY);
        for (cluster, centroid) in self.centroids.chunks_exact(self.dim).enumerate() {
            let dist = crate::simd::l2_squared_simd(vector, centroid);
            if dist < best.1 {
                best = (cluster, dist);
            }
        }
        best
    }

    /// Assignment for every row, computed in parallel; order matches input rows
    pub fn assign_all(&self, vectors: &[f32]) -> Vec<(usize, f32)> {
        vectors
            .par_chunks_exact(self.dim)
            .map(|row| self.assign(row))
            .collect()
    }

    /// The `n` closest centroids to `query`, closest first, ties by cluster index
    pub fn nearest_centroids(&self, query: &[f32], n: usize) -> Vec<usize> {
        let mut dists: Vec<(f32, usize)> = self
            .centroids
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(cluster, c)| (crate::simd::l2_squared_simd(query, c), cluster))
            .collect();
        dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        dists.into_iter().take(n).map(|(_, c)| c).collect()
    }

    /// D^2-weighted seeding
    fn kmeans_plus_plus(&self, vectors: &[f32], n: usize, rng: &mut StdRng) -> Vec<f32> {
        let row = |i: usize| &vectors[i * self.dim..(i + 1) * self.dim];

        let mut centroids = Vec::with_capacity(self.k * self.dim);
        let first = rng.random_range(0..n);
        centroids.extend_from_slice(row(first));

        let mut min_dist: Vec<f32> = (0..n)
            .map(|i| crate::simd::l2_squared_simd(row(i), row(first)))
            .collect();

        for _ in 1..self.k {
            let total: f64 = min_dist.iter().map(|&d| f64::from(d)).sum();
            let chosen = if total > 0.0 {
                let threshold = rng.random::<f64>() * total;
                let mut cumulative = 0.0;
                let mut pick = n - 1;
                for (i, &d) in min_dist.iter().enumerate() {
                    cumulative += f64::from(d);
                    if cumulative >= threshold && d > 0.0 {
                        pick = i;
                        break;
                    }
                }
                pick
            } else {
                // All points coincide with existing centroids
                rng.random_range(0..n)
            };

            centroids.extend_from_slice(row(chosen));
            for (i, d) in min_dist.iter_mut().enumerate() {
                *d = d.min(crate::simd::l2_squared_simd(row(i), row(chosen)));
            }
        }

        centroids
    }

    fn update_centroids(&mut self, vectors: &[f32], assignments: &[(usize, f32)]) {
        let mut sums = vec![0.0f64; self.k * self.dim];
        let mut counts = vec![0usize; self.k];

        for (row, &(cluster, _)) in vectors.chunks_exact(self.dim).zip(assignments) {
            counts[cluster] += 1;
            let acc = &mut sums[cluster * self.dim..(cluster + 1) * self.dim];
            for (s, &x) in acc.iter_mut().zip(row) {
                *s += f64::from(x);
            }
        }

        // Empty clusters take over the points furthest from their own centroid
        let mut far: Vec<usize> = (0..assignments.len()).collect();
        far.sort_by(|&a, &b| {
            assignments[b]
                .1
                .total_cmp(&assignments[a].1)
                .then(a.cmp(&b))
        });
        let mut far = far.into_iter();

        for cluster in 0..self.k {
            let target = &mut self.centroids[cluster * self.dim..(cluster + 1) * self.dim];
            if counts[cluster] > 0 {
                let inv = 1.0 / counts[cluster] as f64;
                let acc = &sums[cluster * self.dim..(cluster + 1) * self.dim];
                for (t, &s) in target.iter_mut().zip(acc) {
                    *t = (s * inv) as f32;
                }
            } else if let Some(i) = far.next() {
                target.copy_from_slice(&vectors[i * self.dim..(i + 1) * self.dim]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_blobs() -> Vec<f32> {
        let mut data = Vec::new();
        for i in 0..20 {
            let jitter = i as f32 * 0.01;
            data.extend_from_slice(&[0.0 + jitter, 0.0 - jitter]);
            data.extend_from_slice(&[10.0 - jitter, 10.0 + jitter]);
        }
        data
    }

    #[test]
    fn test_separates_blobs() {
        let data = two_blobs();
        let mut km = KMeans::new(2, 2).unwrap().with_seed(3);
        km.fit(&data).unwrap();

        let (a, _) = km.assign(&[0.1, 0.1]);
        let (b, _) = km.assign(&[9.9, 9.9]);
        assert_ne!(a, b);
        assert_eq!(km.nearest_centroids(&[0.0, 0.0], 2)[0], a);
    }

    #[test]
    fn test_too_few_vectors_fails() {
        let mut km = KMeans::new(2, 5).unwrap();
        assert!(matches!(km.fit(&[0.0, 0.0, 1.0, 1.0]), Err(Error::IndexBuild(_))));
    }

    #[test]
    fn test_identical_points_do_not_panic() {
        let data = vec![1.0f32; 2 * 10];
        let mut km = KMeans::new(2, 4).unwrap();
        km.fit(&data).unwrap();
        assert_eq!(km.centroids().len(), 8);
    }

    proptest! {
        #[test]
        fn prop_fit_is_deterministic_given_seed(
            seed in any::<u64>(),
            dim in 1usize..6,
            n in 4usize..40,
            k in 1usize..4,
            raw in proptest::collection::vec(-1.0f32..1.0f32, 240),
        ) {
            let data = raw[..n * dim].to_vec();
            let mut a = KMeans::new(dim, k).unwrap().with_seed(seed);
            let mut b = KMeans::new(dim, k).unwrap().with_seed(seed);
            a.fit(&data).unwrap();
            b.fit(&data).unwrap();
            prop_assert_eq!(a.centroids(), b.centroids());
        }
    }
}
