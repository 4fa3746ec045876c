//! # tracklist
//!
//! Playlist generation from per-track audio features.
//!
//! A table of numeric feature rows is standardized and projected onto its
//! leading principal components. One of five nearest-neighbor index
//! strategies is built over the embedding, and playlists are produced by a
//! greedy nearest-unvisited walk through that index. Pairs of playlists can
//! then be compared by centroid and pairwise metrics.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! tracklist --input tracks.json --dim 8 --strategy graph-approx --seed 0 --length 10
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use tracklist::prelude::*;
//!
//! let rows = (0..60)
//!     .map(|i| {
//!         let t = i as f64;
//!         json!({"name": format!("track {}", i), "energy": (t * 0.3).sin(), "tempo": 80.0 + t})
//!     })
//!     .collect();
//! let table = FeatureTable::new(rows);
//!
//! let reducer = FeatureReducer::new(["energy", "tempo"], 2).unwrap();
//! let (_fitted, corpus) = reducer.fit_transform(&table).unwrap();
//! let corpus = Arc::new(corpus);
//!
//! let handle = IndexFactory::default()
//!     .build(corpus.clone(), &IndexSpec::graph_approx(8))
//!     .unwrap();
//! let playlist = PlaylistWalker::default().walk(&handle, 0, 5).unwrap();
//! assert_eq!(playlist.len(), 5);
//! assert_eq!(playlist.first(), Some(0));
//! ```
//!
//! ## Crate Structure
//!
//! - [`tracklist-core`](https://docs.rs/tracklist-core) - Corpus, index strategies, factory, errors
//! - [`tracklist-features`](https://docs.rs/tracklist-features) - Feature table, scaler, PCA, reducer
//! - [`tracklist-playlist`](https://docs.rs/tracklist-playlist) - Walker and similarity scorer

pub mod config;

// Re-export core types
pub use tracklist_core::{
    EmbeddedCorpus, EngineConfig, Error, IndexFactory, IndexHandle, IndexKind, IndexSpec, Metric,
    Neighbor, Result, SpaceId, Vector, VectorIndex,
};

// Re-export feature reduction
pub use tracklist_features::{FeatureReducer, FeatureTable, FittedReducer};

// Re-export playlist generation
pub use tracklist_playlist::{
    Playlist, PlaylistVectors, PlaylistWalker, SimilarityReport, SimilarityScorer, WalkerConfig,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        EmbeddedCorpus, EngineConfig, Error, FeatureReducer, FeatureTable, FittedReducer,
        IndexFactory, IndexHandle, IndexKind, IndexSpec, Playlist, PlaylistWalker, Result,
        SimilarityReport, SimilarityScorer, WalkerConfig,
    };
}

/// SIMD-optimized vector operations
pub mod simd {
    pub use tracklist_core::simd::{dot_product_simd, l2_distance_simd, norm_simd};
}
