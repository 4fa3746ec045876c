//! # tracklist Playlist
//!
//! Playlist generation and evaluation on top of a built index.
//!
//! - [`PlaylistWalker`] - greedy nearest-unvisited walk from a seed item
//! - [`Playlist`] - ordered, duplicate-free item identities
//! - [`SimilarityScorer`] - centroid and pairwise metrics between playlists
//!
//! ```rust
//! use std::sync::Arc;
//! use tracklist_core::{EmbeddedCorpus, IndexFactory, IndexSpec};
//! use tracklist_playlist::{PlaylistWalker, SimilarityScorer};
//!
//! let rows: Vec<Vec<f32>> = (0..12).map(|i| vec![i as f32, (i % 3) as f32]).collect();
//! let corpus = Arc::new(EmbeddedCorpus::from_rows(&rows).unwrap());
//! let handle = IndexFactory::default().build(corpus.clone(), &IndexSpec::FlatL2).unwrap();
//!
//! let walker = PlaylistWalker::default();
//! let a = walker.walk(&handle, 0, 4).unwrap();
//! let b = walker.walk(&handle, 11, 4).unwrap();
//!
//! let report = SimilarityScorer::score(&a.resolve(&corpus).unwrap(), &b.resolve(&corpus).unwrap()).unwrap();
//! assert!(report.pairwise_distance > 0.0);
//! ```

pub mod playlist;
pub mod scorer;
pub mod walker;

pub use playlist::{Playlist, PlaylistVectors};
pub use scorer::{SimilarityReport, SimilarityScorer};
pub use walker::{PlaylistWalker, WalkerConfig, DEFAULT_FAN_OUT};
