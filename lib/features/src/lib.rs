//! # tracklist Features
//!
//! Turns a table of per-track audio features into a low-dimensional
//! [`EmbeddedCorpus`](tracklist_core::EmbeddedCorpus).
//!
//! - [`FeatureTable`] - JSON rows with numeric feature fields and metadata
//! - [`StandardScaler`] - zero-mean, unit-variance columns
//! - [`Pca`] - projection onto the leading principal components
//! - [`FeatureReducer`] / [`FittedReducer`] - the two combined, fitted once
//!
//! ```rust
//! use serde_json::json;
//! use tracklist_features::{FeatureReducer, FeatureTable};
//!
//! let table = FeatureTable::new(vec![
//!     json!({"name": "a", "energy": 0.1, "tempo": 100.0}),
//!     json!({"name": "b", "energy": 0.9, "tempo": 128.0}),
//!     json!({"name": "c", "energy": 0.5, "tempo": 140.0}),
//! ]);
//! let reducer = FeatureReducer::new(["energy", "tempo"], 1).unwrap();
//! let (_, corpus) = reducer.fit_transform(&table).unwrap();
//! assert_eq!(corpus.len(), 3);
//! assert_eq!(corpus.dim(), 1);
//! ```

pub mod pca;
pub mod reducer;
pub mod scaler;
pub mod table;

pub use pca::Pca;
pub use reducer::{FeatureReducer, FittedReducer};
pub use scaler::StandardScaler;
pub use table::FeatureTable;
