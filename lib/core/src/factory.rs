//! Index factory
//!
//! Turns an [`IndexSpec`] into a trained, populated [`IndexHandle`]. All
//! parameter checks run before any index is constructed or trained.

use crate::index::hnsw::{DEFAULT_EF_CONSTRUCTION, DEFAULT_EF_SEARCH};
use crate::index::{
    FlatIndex, HnswIndex, IvfFlatIndex, IvfPqIndex, Metric, Neighbor, VectorIndex,
};
use crate::{EmbeddedCorpus, EngineConfig, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

fn default_ef_construction() -> usize {
    DEFAULT_EF_CONSTRUCTION
}

fn default_ef_search() -> usize {
    DEFAULT_EF_SEARCH
}

fn default_bits_per_code() -> u32 {
    8
}

/// Training and insertion failures all surface as build errors
fn into_build_error(err: Error) -> Error {
    match err {
        Error::IndexBuild(msg) => Error::IndexBuild(msg),
        other => Error::IndexBuild(other.to_string()),
    }
}

/// Index strategy together with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum IndexSpec {
    /// Exact exhaustive scan under squared L2
    FlatL2,
    /// Exact exhaustive scan under inner product over L2-normalized vectors
    FlatInnerProduct,
    /// Layered proximity graph
    GraphApprox {
        max_connections: usize,
        #[serde(default = "default_ef_construction")]
        ef_construction: usize,
        #[serde(default = "default_ef_search")]
        ef_search: usize,
    },
    /// Inverted file, exact distances within probed clusters
    ClusteredFlat {
        cluster_count: usize,
        probe_count: usize,
    },
    /// Inverted file over product-quantized residuals
    ClusteredQuantized {
        cluster_count: usize,
        probe_count: usize,
        segment_count: usize,
        #[serde(default = "default_bits_per_code")]
        bits_per_code: u32,
    },
}

/// Parameter-free strategy tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexKind {
    FlatL2,
    FlatInnerProduct,
    GraphApprox,
    ClusteredFlat,
    ClusteredQuantized,
}

impl IndexKind {
    pub const ALL: [IndexKind; 5] = [
        IndexKind::FlatL2,
        IndexKind::FlatInnerProduct,
        IndexKind::GraphApprox,
        IndexKind::ClusteredFlat,
        IndexKind::ClusteredQuantized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndexKind::FlatL2 => "flat-l2",
            IndexKind::FlatInnerProduct => "flat-inner-product",
            IndexKind::GraphApprox => "graph-approx",
            IndexKind::ClusteredFlat => "clustered-flat",
            IndexKind::ClusteredQuantized => "clustered-quantized",
        }
    }

    pub fn requires_training(self) -> bool {
        matches!(self, IndexKind::ClusteredFlat | IndexKind::ClusteredQuantized)
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        IndexKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "unknown index strategy '{}', expected one of: {}",
                    s,
                    IndexKind::ALL.map(IndexKind::as_str).join(", ")
                ))
            })
    }
}

impl IndexSpec {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexSpec::FlatL2 => IndexKind::FlatL2,
            IndexSpec::FlatInnerProduct => IndexKind::FlatInnerProduct,
            IndexSpec::GraphApprox { .. } => IndexKind::GraphApprox,
            IndexSpec::ClusteredFlat { .. } => IndexKind::ClusteredFlat,
            IndexSpec::ClusteredQuantized { .. } => IndexKind::ClusteredQuantized,
        }
    }

    pub fn graph_approx(max_connections: usize) -> Self {
        IndexSpec::GraphApprox {
            max_connections,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
        }
    }

    pub fn clustered_flat(cluster_count: usize, probe_count: usize) -> Self {
        IndexSpec::ClusteredFlat {
            cluster_count,
            probe_count,
        }
    }

    pub fn clustered_quantized(cluster_count: usize, probe_count: usize, segment_count: usize) -> Self {
        IndexSpec::ClusteredQuantized {
            cluster_count,
            probe_count,
            segment_count,
            bits_per_code: default_bits_per_code(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A built index bound to the corpus that was inserted into it.
///
/// Queries take `&self`; a handle is never retrained or extended after
/// [`IndexFactory::build`] returns it.
pub struct IndexHandle {
    index: Box<dyn VectorIndex>,
    corpus: Arc<EmbeddedCorpus>,
    spec: Option<IndexSpec>,
}

impl IndexHandle {
    /// Wrap an already populated index. The index must hold exactly the rows of
    /// `corpus`, in order.
    pub fn from_index(index: Box<dyn VectorIndex>, corpus: Arc<EmbeddedCorpus>) -> Result<Self> {
        if index.dim() != corpus.dim() {
            return Err(Error::DimensionMismatch {
                expected: corpus.dim(),
                actual: index.dim(),
            });
        }
        if index.len() != corpus.len() {
            return Err(Error::IndexBuild(format!(
                "index holds {} vectors but the corpus has {}",
                index.len(),
                corpus.len()
            )));
        }
        Ok(Self {
            index,
            corpus,
            spec: None,
        })
    }

    /// The vectors as inserted (L2-normalized for the inner-product strategy)
    pub fn corpus(&self) -> &Arc<EmbeddedCorpus> {
        &self.corpus
    }

    pub fn spec(&self) -> Option<&IndexSpec> {
        self.spec.as_ref()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.index.name()
    }

    pub fn metric(&self) -> Metric {
        self.index.metric()
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    /// Inserted embedding of item `id`
    pub fn embedding(&self, id: usize) -> Option<&[f32]> {
        self.corpus.row(id)
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.index.search(query, k)
    }
}

impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHandle")
            .field("strategy", &self.index.name())
            .field("len", &self.corpus.len())
            .field("dim", &self.corpus.dim())
            .field("spec", &self.spec)
            .finish()
    }
}

/// Validates index specs and builds handles
#[derive(Debug, Clone, Default)]
pub struct IndexFactory {
    config: EngineConfig,
}

impl IndexFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Largest cluster count that still leaves enough training vectors per cluster
    pub fn max_cluster_count(&self, corpus_len: usize) -> usize {
        corpus_len / self.config.min_training_points_per_cluster.max(1)
    }

    /// Check a spec against a corpus shape without building anything
    pub fn validate(&self, corpus_len: usize, dim: usize, spec: &IndexSpec) -> Result<()> {
        if corpus_len == 0 {
            return Err(Error::Configuration("cannot index an empty corpus".to_string()));
        }

        match *spec {
            IndexSpec::FlatL2 | IndexSpec::FlatInnerProduct => Ok(()),
            IndexSpec::GraphApprox {
                max_connections,
                ef_construction,
                ef_search,
            } => {
                if max_connections < 2 {
                    return Err(Error::Configuration(format!(
                        "max connections per node must be at least 2, got {}",
                        max_connections
                    )));
                }
                if ef_construction == 0 || ef_search == 0 {
                    return Err(Error::Configuration(
                        "ef_construction and ef_search must be greater than 0".to_string(),
                    ));
                }
                Ok(())
            }
            IndexSpec::ClusteredFlat {
                cluster_count,
                probe_count,
            } => self.validate_clusters(corpus_len, cluster_count, probe_count),
            IndexSpec::ClusteredQuantized {
                cluster_count,
                probe_count,
                segment_count,
                bits_per_code,
            } => {
                self.validate_clusters(corpus_len, cluster_count, probe_count)?;
                if segment_count == 0 || dim % segment_count != 0 {
                    return Err(Error::Configuration(format!(
                        "segment count {} does not evenly divide embedding dimension {}",
                        segment_count, dim
                    )));
                }
                if !(1..=8).contains(&bits_per_code) {
                    return Err(Error::Configuration(format!(
                        "bits per code must be in 1..=8, got {}",
                        bits_per_code
                    )));
                }
                let codebook_size = 1usize << bits_per_code;
                if codebook_size > corpus_len {
                    return Err(Error::Configuration(format!(
                        "{} codewords per segment need at least {} training vectors, corpus has {}",
                        codebook_size, codebook_size, corpus_len
                    )));
                }
                Ok(())
            }
        }
    }

    fn validate_clusters(
        &self,
        corpus_len: usize,
        cluster_count: usize,
        probe_count: usize,
    ) -> Result<()> {
        if cluster_count == 0 {
            return Err(Error::Configuration("cluster count must be greater than 0".to_string()));
        }
        let max = self.max_cluster_count(corpus_len);
        if cluster_count > max {
            return Err(Error::Configuration(format!(
                "{} clusters need at least {} training vectors ({} per cluster), corpus has {}",
                cluster_count,
                cluster_count.saturating_mul(self.config.min_training_points_per_cluster),
                self.config.min_training_points_per_cluster,
                corpus_len
            )));
        }
        if probe_count == 0 || probe_count > cluster_count {
            return Err(Error::Configuration(format!(
                "probe count {} must be in 1..={}",
                probe_count, cluster_count
            )));
        }
        Ok(())
    }

    /// Validate, construct, train (when the strategy needs it) and populate an index
    pub fn build(&self, corpus: Arc<EmbeddedCorpus>, spec: &IndexSpec) -> Result<IndexHandle> {
        let dim = corpus.dim();
        self.validate(corpus.len(), dim, spec)?;

        let seed = self.config.seed;
        let iterations = self.config.kmeans_iterations;
        let inserted = match spec {
            IndexSpec::FlatInnerProduct => Arc::new(corpus.l2_normalized()),
            _ => corpus,
        };

        let mut index: Box<dyn VectorIndex> = match *spec {
            IndexSpec::FlatL2 => Box::new(FlatIndex::l2(dim)),
            IndexSpec::FlatInnerProduct => Box::new(FlatIndex::inner_product(dim)),
            IndexSpec::GraphApprox {
                max_connections,
                ef_construction,
                ef_search,
            } => Box::new(
                HnswIndex::new(dim, max_connections)?
                    .with_ef(ef_construction, ef_search)
                    .with_seed(seed),
            ),
            IndexSpec::ClusteredFlat {
                cluster_count,
                probe_count,
            } => Box::new(
                IvfFlatIndex::new(dim, cluster_count, probe_count)?
                    .with_training(seed, iterations),
            ),
            IndexSpec::ClusteredQuantized {
                cluster_count,
                probe_count,
                segment_count,
                bits_per_code,
            } => Box::new(
                IvfPqIndex::new(dim, cluster_count, probe_count, segment_count, bits_per_code)?
                    .with_training(seed, iterations),
            ),
        };

        if index.requires_training() {
            debug!(strategy = index.name(), vectors = inserted.len(), "training index");
            index.train(inserted.as_slice()).map_err(into_build_error)?;
        }
        index.add(inserted.as_slice()).map_err(into_build_error)?;

        info!(
            strategy = index.name(),
            vectors = index.len(),
            dim,
            "index built"
        );

        Ok(IndexHandle {
            index,
            corpus: inserted,
            spec: Some(spec.clone()),
        })
    }
}
