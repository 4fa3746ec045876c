use super::{batch_rows, check_query, Metric, Neighbor, VectorIndex};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Upper bound on graph levels
const MAX_LAYERS: usize = 16;

pub const DEFAULT_EF_CONSTRUCTION: usize = 40;
pub const DEFAULT_EF_SEARCH: usize = 16;

/// Bit vector for visited node tracking during one layer search
struct VisitedSet {
    bits: Vec<u64>,
}

impl VisitedSet {
    #[inline]
    fn new(capacity: usize) -> Self {
        Self {
            bits: vec![0; (capacity + 63) / 64],
        }
    }

    /// Returns true if `idx` was not yet visited
    #[inline]
    fn insert(&mut self, idx: usize) -> bool {
        let word = idx / 64;
        let mask = 1u64 << (idx % 64);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let fresh = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        fresh
    }

    #[inline]
    fn contains(&self, idx: usize) -> bool {
        self.bits
            .get(idx / 64)
            .map(|w| w & (1u64 << (idx % 64)) != 0)
            .unwrap_or(false)
    }
}

/// Candidate for search with distance (min-heap: closest first)
#[derive(Clone, Copy)]
struct Candidate {
    idx: usize,
    dist: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reverse candidate for max-heap (furthest first)
#[derive(Clone, Copy)]
struct ReverseCandidate {
    idx: usize,
    dist: f32,
}

impl PartialEq for ReverseCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReverseCandidate {}

impl Ord for ReverseCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.idx.cmp(&other.idx))
    }
}

impl PartialOrd for ReverseCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct HnswNode {
    /// Neighbor lists, one per level the node lives on
    layers: Vec<Vec<usize>>,
}

/// HNSW graph index for approximate nearest neighbor search under squared L2.
///
/// Level assignment draws from a seeded RNG, so identical inputs and seed
/// build identical graphs.
#[derive(Debug, Clone)]
pub struct HnswIndex {
    nodes: Vec<HnswNode>,
    /// Contiguous storage for all vectors
    vectors: Vec<f32>,
    dim: usize,
    max_connections: usize,
    ef_construction: usize,
    ef_search: usize,
    entry_point: Option<usize>,
    top_layer: usize,
    level_mult: f64,
    rng: StdRng,
}

impl HnswIndex {
    pub fn new(dim: usize, max_connections: usize) -> Result<Self> {
        if max_connections < 2 {
            return Err(Error::Configuration(format!(
                "max connections per node must be at least 2, got {}",
                max_connections
            )));
        }
        Ok(Self {
            nodes: Vec::new(),
            vectors: Vec::new(),
            dim,
            max_connections,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
            entry_point: None,
            top_layer: 0,
            level_mult: 1.0 / (max_connections as f64).ln(),
            rng: StdRng::seed_from_u64(crate::config::DEFAULT_SEED),
        })
    }

    #[must_use]
    pub fn with_ef(mut self, ef_construction: usize, ef_search: usize) -> Self {
        self.ef_construction = ef_construction.max(1);
        self.ef_search = ef_search.max(1);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[inline]
    pub fn ef_search(&self) -> usize {
        self.ef_search
    }

    #[inline]
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Get vector slice for a node
    #[inline(always)]
    fn get_vector(&self, node_idx: usize) -> &[f32] {
        &self.vectors[node_idx * self.dim..(node_idx + 1) * self.dim]
    }

    #[inline(always)]
    fn distance_to_node(&self, query: &[f32], node_idx: usize) -> f32 {
        crate::simd::l2_squared_simd(query, self.get_vector(node_idx))
    }

    /// Exponentially decaying level draw
    #[inline]
    fn select_layer(&mut self) -> usize {
        let u: f64 = self.rng.random::<f64>();
        let level = (-(1.0 - u).ln() * self.level_mult).floor() as usize;
        level.min(MAX_LAYERS - 1)
    }

    #[inline]
    fn layer_capacity(&self, layer: usize) -> usize {
        if layer == 0 {
            self.max_connections * 2
        } else {
            self.max_connections
        }
    }

    /// Single-step greedy descent on an upper layer
    fn greedy_closest(&self, query: &[f32], mut current: usize, layer: usize) -> usize {
        let mut current_dist = self.distance_to_node(query, current);
        loop {
            let mut improved = false;
            if let Some(neighbors) = self.nodes[current].layers.get(layer) {
                for &n in neighbors {
                    let d = self.distance_to_node(query, n);
                    if d < current_dist {
                        current_dist = d;
                        current = n;
                        improved = true;
                    }
                }
            }
            if !improved {
                return current;
            }
        }
    }

    /// Beam search on one layer; result sorted closest first
    fn search_layer(
        &self,
        query: &[f32],
        entry_point: usize,
        ef: usize,
        layer: usize,
    ) -> Vec<(usize, f32)> {
        let mut visited = VisitedSet::new(self.nodes.len());
        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::with_capacity(ef * 2);
        let mut results: BinaryHeap<ReverseCandidate> = BinaryHeap::with_capacity(ef + 1);

        let entry_dist = self.distance_to_node(query, entry_point);
        candidates.push(Candidate { idx: entry_point, dist: entry_dist });
        results.push(ReverseCandidate { idx: entry_point, dist: entry_dist });
        visited.insert(entry_point);

        let mut worst_dist = entry_dist;

        while let Some(Candidate { idx: current_idx, dist: current_dist }) = candidates.pop() {
            if results.len() >= ef && current_dist > worst_dist {
                break;
            }

            let Some(neighbors) = self.nodes[current_idx].layers.get(layer) else {
                continue;
            };

            for &neighbor_idx in neighbors {
                if !visited.insert(neighbor_idx) {
                    continue;
                }
                let dist = self.distance_to_node(query, neighbor_idx);
                if results.len() < ef || dist < worst_dist {
                    candidates.push(Candidate { idx: neighbor_idx, dist });
                    results.push(ReverseCandidate { idx: neighbor_idx, dist });
                    if results.len() > ef {
                        results.pop();
                    }
                    if let Some(worst) = results.peek() {
                        worst_dist = worst.dist;
                    }
                }
            }
        }

        debug_assert!(visited.contains(entry_point));
        let mut result_vec: Vec<(usize, f32)> =
            results.into_iter().map(|c| (c.idx, c.dist)).collect();
        result_vec.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        result_vec
    }

    /// Insert one vector; its id is the current length
    fn insert(&mut self, vector: &[f32]) {
        let node_idx = self.nodes.len();
        let level = self.select_layer();
        self.vectors.extend_from_slice(vector);
        self.nodes.push(HnswNode {
            layers: vec![Vec::new(); level + 1],
        });

        let Some(mut entry) = self.entry_point else {
            self.entry_point = Some(node_idx);
            self.top_layer = level;
            return;
        };

        for layer in (level + 1..=self.top_layer).rev() {
            entry = self.greedy_closest(vector, entry, layer);
        }

        for layer in (0..=level.min(self.top_layer)).rev() {
            let candidates = self.search_layer(vector, entry, self.ef_construction, layer);
            let neighbors: Vec<usize> = candidates
                .iter()
                .take(self.max_connections)
                .map(|&(idx, _)| idx)
                .collect();

            self.nodes[node_idx].layers[layer] = neighbors.clone();

            let capacity = self.layer_capacity(layer);
            for &neighbor_idx in &neighbors {
                self.nodes[neighbor_idx].layers[layer].push(node_idx);
                if self.nodes[neighbor_idx].layers[layer].len() > capacity {
                    let neighbor_vec = self.get_vector(neighbor_idx).to_vec();
                    let mut connections = std::mem::take(&mut self.nodes[neighbor_idx].layers[layer]);
                    connections.sort_by(|&a, &b| {
                        let da = self.distance_to_node(&neighbor_vec, a);
                        let db = self.distance_to_node(&neighbor_vec, b);
                        da.total_cmp(&db).then(a.cmp(&b))
                    });
                    connections.truncate(capacity);
                    self.nodes[neighbor_idx].layers[layer] = connections;
                }
            }

            if let Some(&(closest, _)) = candidates.first() {
                entry = closest;
            }
        }

        if level > self.top_layer {
            self.top_layer = level;
            self.entry_point = Some(node_idx);
        }
    }
}

impl VectorIndex for HnswIndex {
    fn name(&self) -> &'static str {
        "graph-approx"
    }

    fn metric(&self) -> Metric {
        Metric::L2
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn add(&mut self, vectors: &[f32]) -> Result<()> {
        batch_rows(self.dim, vectors)?;
        for row in vectors.chunks_exact(self.dim) {
            self.insert(row);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        check_query(self.dim, query)?;
        let Some(mut entry) = self.entry_point else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        for layer in (1..=self.top_layer).rev() {
            entry = self.greedy_closest(query, entry, layer);
        }

        let ef = self.ef_search.max(k);
        Ok(self
            .search_layer(query, entry, ef, 0)
            .into_iter()
            .take(k)
            .map(|(id, distance)| Neighbor { id, distance })
            .collect())
    }
}
