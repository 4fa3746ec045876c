//! Greedy nearest-unvisited walk
//!
//! Starting from a seed item, repeatedly query the index with the embedding of
//! the last appended item and append the first returned neighbor that has not
//! been visited yet. Neighbor order is whatever the index returns.
//!
//! When every returned neighbor is already visited the request is widened by
//! doubling `k` up to the corpus size. If even a full-corpus request has no
//! unvisited neighbor, the walk fails with [`Error::WalkExhausted`].

use crate::playlist::Playlist;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use tracklist_core::{Error, IndexHandle, Result};

/// Neighbors requested per step before any widening
pub const DEFAULT_FAN_OUT: usize = 10;

/// Walker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    pub fan_out: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            fan_out: DEFAULT_FAN_OUT,
        }
    }
}

impl WalkerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Builds playlists by walking an index
#[derive(Debug, Clone, Default)]
pub struct PlaylistWalker {
    config: WalkerConfig,
}

impl PlaylistWalker {
    pub fn new(config: WalkerConfig) -> Result<Self> {
        if config.fan_out == 0 {
            return Err(Error::Configuration(
                "walker fan-out must be greater than 0".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Walk `handle` from `seed` until the playlist holds `target_length` items
    pub fn walk(&self, handle: &IndexHandle, seed: usize, target_length: usize) -> Result<Playlist> {
        let corpus_len = handle.len();
        if seed >= corpus_len {
            return Err(Error::InvalidRequest(format!(
                "seed item {} is not in the corpus ({} items)",
                seed, corpus_len
            )));
        }
        if target_length == 0 || target_length > corpus_len {
            return Err(Error::InvalidRequest(format!(
                "target length {} must be between 1 and {}",
                target_length, corpus_len
            )));
        }

        let fan_out = self.config.fan_out.min(corpus_len);
        let mut visited = AHashSet::with_capacity(target_length);
        visited.insert(seed);
        let mut items = Vec::with_capacity(target_length);
        items.push(seed);

        let mut current = seed;
        while items.len() < target_length {
            let query = handle.embedding(current).ok_or_else(|| {
                Error::Query(format!("item {} has no embedding in the index", current))
            })?;

            let mut k = fan_out;
            let next = loop {
                let hits = handle.search(query, k).map_err(into_query_error)?;
                let mut found = None;
                for hit in &hits {
                    if hit.id >= corpus_len {
                        return Err(Error::Query(format!(
                            "index returned item {} outside the corpus ({} items)",
                            hit.id, corpus_len
                        )));
                    }
                    if !visited.contains(&hit.id) {
                        found = Some(hit.id);
                        break;
                    }
                }
                match found {
                    Some(id) => break id,
                    None if k >= corpus_len => {
                        return Err(Error::WalkExhausted {
                            produced: items.len(),
                            target: target_length,
                            last: current,
                        });
                    }
                    None => {
                        let widened = (k * 2).min(corpus_len);
                        debug!(
                            "All {} neighbors of item {} visited, widening to {}",
                            hits.len(),
                            current,
                            widened
                        );
                        k = widened;
                    }
                }
            };

            trace!("Walk step {}: {} -> {}", items.len(), current, next);
            visited.insert(next);
            items.push(next);
            current = next;
        }

        debug!(
            "Walked {} items from seed {} over {}",
            items.len(),
            seed,
            handle.strategy_name()
        );
        Ok(Playlist::from_distinct(items))
    }
}

fn into_query_error(err: Error) -> Error {
    match err {
        Error::Query(msg) => Error::Query(msg),
        other => Error::Query(other.to_string()),
    }
}
