//! Playlist similarity
//!
//! Pure functions comparing two resolved playlists. Both must come from the
//! same embedding space; all sums run in f64.

use crate::playlist::PlaylistVectors;
use serde::{Deserialize, Serialize};
use tracklist_core::{EmbeddedCorpus, Error, Result};

/// All three playlist metrics at once
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityReport {
    /// Cosine similarity of the centroids, in [-1, 1]
    pub cosine: f64,
    /// Euclidean distance between the centroids
    pub centroid_distance: f64,
    /// Mean Euclidean distance over every cross pair
    pub pairwise_distance: f64,
}

/// Namespace for the playlist metrics
pub struct SimilarityScorer;

impl SimilarityScorer {
    /// Cosine similarity of the two mean vectors; 0.0 when either mean is zero
    pub fn centroid_cosine(a: &PlaylistVectors, b: &PlaylistVectors) -> Result<f64> {
        check_compatible(a, b)?;
        Ok(cosine(&a.centroid(), &b.centroid()))
    }

    /// Euclidean distance between the two mean vectors
    pub fn centroid_distance(a: &PlaylistVectors, b: &PlaylistVectors) -> Result<f64> {
        check_compatible(a, b)?;
        Ok(euclidean(&a.centroid(), &b.centroid()))
    }

    /// Mean distance over all `a.len() * b.len()` cross pairs
    pub fn mean_pairwise_distance(a: &PlaylistVectors, b: &PlaylistVectors) -> Result<f64> {
        check_compatible(a, b)?;
        let mut total = 0.0f64;
        for x in a.rows() {
            for y in b.rows() {
                total += euclidean_f32(x, y);
            }
        }
        Ok(total / (a.len() * b.len()) as f64)
    }

    pub fn score(a: &PlaylistVectors, b: &PlaylistVectors) -> Result<SimilarityReport> {
        Ok(SimilarityReport {
            cosine: Self::centroid_cosine(a, b)?,
            centroid_distance: Self::centroid_distance(a, b)?,
            pairwise_distance: Self::mean_pairwise_distance(a, b)?,
        })
    }

    /// Cosine similarity and Euclidean distance between two corpus items
    pub fn item_similarity(corpus: &EmbeddedCorpus, i: usize, j: usize) -> Result<(f64, f64)> {
        let row = |id: usize| {
            corpus.row(id).ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "item {} is not in the corpus ({} items)",
                    id,
                    corpus.len()
                ))
            })
        };
        let x: Vec<f64> = row(i)?.iter().map(|&v| v as f64).collect();
        let y: Vec<f64> = row(j)?.iter().map(|&v| v as f64).collect();
        Ok((cosine(&x, &y), euclidean(&x, &y)))
    }
}

fn check_compatible(a: &PlaylistVectors, b: &PlaylistVectors) -> Result<()> {
    if a.dim() != b.dim() {
        return Err(Error::DimensionMismatch {
            expected: a.dim(),
            actual: b.dim(),
        });
    }
    if a.space() != b.space() {
        return Err(Error::SpaceMismatch {
            left: a.space().to_string(),
            right: b.space().to_string(),
        });
    }
    Ok(())
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut na = 0.0;
    let mut nb = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb).sqrt()).clamp(-1.0, 1.0)
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn euclidean_f32(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::Playlist;

    fn corpus() -> EmbeddedCorpus {
        EmbeddedCorpus::from_rows(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
            vec![3.0, 4.0],
            vec![0.0, 0.0],
        ])
        .unwrap()
    }

    fn vectors(ids: &[usize]) -> PlaylistVectors {
        Playlist::new(ids.to_vec()).unwrap().resolve(&corpus()).unwrap()
    }

    #[test]
    fn test_reflexive() {
        let p = vectors(&[0, 1, 3]);
        assert_eq!(SimilarityScorer::centroid_cosine(&p, &p).unwrap(), 1.0);
        assert_eq!(SimilarityScorer::centroid_distance(&p, &p).unwrap(), 0.0);
    }

    #[test]
    fn test_opposite_centroids() {
        let a = vectors(&[0]);
        let b = vectors(&[2]);
        assert_eq!(SimilarityScorer::centroid_cosine(&a, &b).unwrap(), -1.0);
        assert_eq!(SimilarityScorer::centroid_distance(&a, &b).unwrap(), 2.0);
    }

    #[test]
    fn test_zero_centroid_cosine_is_zero() {
        // centroid of [1,0] and [-1,0] is the origin
        let a = vectors(&[0, 2]);
        let b = vectors(&[1]);
        assert_eq!(SimilarityScorer::centroid_cosine(&a, &b).unwrap(), 0.0);
        assert_eq!(SimilarityScorer::centroid_distance(&a, &b).unwrap(), 1.0);
    }

    #[test]
    fn test_mean_pairwise_over_cross_product() {
        let a = vectors(&[0, 4]);
        let b = vectors(&[3]);
        // |(1,0)-(3,4)| = sqrt(20), |(0,0)-(3,4)| = 5
        let expected = (20.0f64.sqrt() + 5.0) / 2.0;
        let got = SimilarityScorer::mean_pairwise_distance(&a, &b).unwrap();
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn test_score_bundles_metrics() {
        let a = vectors(&[0, 1]);
        let b = vectors(&[3, 4]);
        let report = SimilarityScorer::score(&a, &b).unwrap();
        assert_eq!(
            report.cosine,
            SimilarityScorer::centroid_cosine(&a, &b).unwrap()
        );
        assert_eq!(
            report.pairwise_distance,
            SimilarityScorer::mean_pairwise_distance(&a, &b).unwrap()
        );
        let json = serde_json::to_value(report).unwrap();
        assert!(json.get("centroid_distance").is_some());
    }

    #[test]
    fn test_mismatched_spaces_are_rejected() {
        let a = vectors(&[0, 1]);
        let other = EmbeddedCorpus::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let b = Playlist::new(vec![0, 1]).unwrap().resolve(&other).unwrap();
        assert!(matches!(
            SimilarityScorer::score(&a, &b),
            Err(Error::SpaceMismatch { .. })
        ));

        let wide = EmbeddedCorpus::from_rows(&[vec![1.0, 0.0, 0.0]]).unwrap();
        let c = Playlist::new(vec![0]).unwrap().resolve(&wide).unwrap();
        assert!(SimilarityScorer::centroid_distance(&a, &c)
            .unwrap_err()
            .is_dimension_mismatch());
    }

    #[test]
    fn test_item_similarity() {
        let c = corpus();
        let (cos, dist) = SimilarityScorer::item_similarity(&c, 0, 1).unwrap();
        assert_eq!(cos, 0.0);
        assert!((dist - 2.0f64.sqrt()).abs() < 1e-12);
        assert!(matches!(
            SimilarityScorer::item_similarity(&c, 0, 9),
            Err(Error::InvalidRequest(_))
        ));

        let line = EmbeddedCorpus::new(vec![0.0, 1.0, 2.0], 1).unwrap();
        assert!(matches!(
            SimilarityScorer::item_similarity(&line, usize::MAX, 0),
            Err(Error::InvalidRequest(_))
        ));
    }
}
