//! Playlists and their resolved embeddings

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracklist_core::{EmbeddedCorpus, Error, Result, SpaceId};
use tracklist_features::FeatureTable;

/// Ordered sequence of distinct item identities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Playlist {
    items: Vec<usize>,
}

impl Playlist {
    /// Build a playlist, rejecting repeated identities
    pub fn new(items: Vec<usize>) -> Result<Self> {
        let mut seen = AHashSet::with_capacity(items.len());
        for &id in &items {
            if !seen.insert(id) {
                return Err(Error::InvalidRequest(format!(
                    "item {} appears more than once in the playlist",
                    id
                )));
            }
        }
        Ok(Self { items })
    }

    /// Caller guarantees distinct items
    pub(crate) fn from_distinct(items: Vec<usize>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[usize] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<usize> {
        self.items.first().copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.items.last().copied()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.items.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.iter().copied()
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.items
    }

    /// Gather the embedding of every item from `corpus`
    pub fn resolve(&self, corpus: &EmbeddedCorpus) -> Result<PlaylistVectors> {
        if self.items.is_empty() {
            return Err(Error::InvalidRequest("playlist is empty".to_string()));
        }
        let mut data = Vec::with_capacity(self.items.len() * corpus.dim());
        for &id in &self.items {
            let row = corpus.row(id).ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "item {} is not in the corpus ({} items)",
                    id,
                    corpus.len()
                ))
            })?;
            data.extend_from_slice(row);
        }
        Ok(PlaylistVectors {
            data,
            dim: corpus.dim(),
            space: corpus.space(),
        })
    }

    /// Metadata value of `field` for every item, e.g. track names
    pub fn labels(&self, table: &FeatureTable, field: &str) -> Vec<Option<String>> {
        self.items.iter().map(|&id| table.label(id, field)).collect()
    }
}

impl TryFrom<Vec<usize>> for Playlist {
    type Error = Error;

    fn try_from(items: Vec<usize>) -> Result<Self> {
        Self::new(items)
    }
}

impl From<Playlist> for Vec<usize> {
    fn from(playlist: Playlist) -> Self {
        playlist.items
    }
}

impl<'a> IntoIterator for &'a Playlist {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Embeddings of a playlist's items, in playlist order
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistVectors {
    data: Vec<f32>,
    dim: usize,
    space: SpaceId,
}

impl PlaylistVectors {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn space(&self) -> SpaceId {
        self.space
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dim)
    }

    /// Mean vector, accumulated in f64
    pub fn centroid(&self) -> Vec<f64> {
        let mut sum = vec![0.0f64; self.dim];
        for row in self.rows() {
            for (s, &x) in sum.iter_mut().zip(row) {
                *s += x as f64;
            }
        }
        let n = self.len() as f64;
        for s in &mut sum {
            *s /= n;
        }
        sum
    }
}
