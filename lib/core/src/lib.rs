//! # tracklist Core
//!
//! Core library for the tracklist playlist engine.
//!
//! This crate provides the data structures every other tracklist crate builds on:
//!
//! - [`EmbeddedCorpus`] - Row-major f32 matrix of item embeddings
//! - [`VectorIndex`] - The train / add / search contract of an index strategy
//! - [`IndexSpec`] - Closed set of strategies with their parameters
//! - [`IndexFactory`] - Validates a spec and builds an [`IndexHandle`]
//! - [`Error`] - The error taxonomy shared across the workspace
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tracklist_core::{EmbeddedCorpus, IndexFactory, IndexSpec};
//!
//! let corpus = EmbeddedCorpus::from_rows(&[
//!     vec![0.0, 0.0],
//!     vec![1.0, 0.0],
//!     vec![5.0, 5.0],
//! ]).unwrap();
//!
//! let factory = IndexFactory::default();
//! let handle = factory.build(Arc::new(corpus), &IndexSpec::FlatL2).unwrap();
//! let hits = handle.search(&[0.9, 0.1], 2).unwrap();
//! assert_eq!(hits[0].id, 1);
//! ```

pub mod config;
pub mod corpus;
pub mod error;
pub mod factory;
pub mod index;
pub mod vector;

/// Distance kernels
///
/// Squared L2 and dot product with AVX2/FMA on x86_64 and NEON on ARM64,
/// falling back to pipelined scalar code.
pub mod simd;

pub use config::EngineConfig;
pub use corpus::{EmbeddedCorpus, SpaceId};
pub use error::{Error, Result};
pub use factory::{IndexFactory, IndexHandle, IndexKind, IndexSpec};
pub use index::{Metric, Neighbor, VectorIndex};
pub use vector::Vector;
