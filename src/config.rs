//! Input and configuration loading for the `tracklist` binary

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracklist_core::{IndexFactory, IndexKind, IndexSpec, Result};
use tracklist_features::FeatureTable;

/// Metadata fields that are never treated as features when none are named
pub const DESCRIPTIVE_FIELDS: &[&str] = &["id", "name", "artist", "album", "genre", "uri"];

/// Deserialize a JSON file
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Read a feature table stored as a JSON array of objects
pub fn load_table(path: &Path) -> Result<FeatureTable> {
    let raw = fs::read_to_string(path)?;
    FeatureTable::from_json(&raw)
}

/// Reasonable parameters for a strategy on a corpus of this shape.
///
/// Cluster counts stay within the factory's training-points rule, segment
/// counts divide `dim` and codebooks never outnumber the corpus.
pub fn default_spec(
    kind: IndexKind,
    corpus_len: usize,
    dim: usize,
    factory: &IndexFactory,
) -> IndexSpec {
    let clusters = || {
        let sqrt = (corpus_len as f64).sqrt().round() as usize;
        factory.max_cluster_count(corpus_len).min(sqrt).max(1)
    };

    match kind {
        IndexKind::FlatL2 => IndexSpec::FlatL2,
        IndexKind::FlatInnerProduct => IndexSpec::FlatInnerProduct,
        IndexKind::GraphApprox => IndexSpec::graph_approx(16),
        IndexKind::ClusteredFlat => {
            let cluster_count = clusters();
            IndexSpec::clustered_flat(cluster_count, (cluster_count / 4).max(1))
        }
        IndexKind::ClusteredQuantized => {
            let cluster_count = clusters();
            let segment_count = [8, 4, 2, 1]
                .into_iter()
                .find(|s| *s <= dim && dim % s == 0)
                .unwrap_or(1);
            let bits_per_code = if corpus_len < 2 {
                1
            } else {
                (usize::BITS - 1 - corpus_len.leading_zeros()).min(8)
            };
            IndexSpec::ClusteredQuantized {
                cluster_count,
                probe_count: (cluster_count / 4).max(1),
                segment_count,
                bits_per_code,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracklist_core::{EngineConfig, Error};

    #[test]
    fn test_load_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"min_training_points_per_cluster": 10, "seed": 7}}"#).unwrap();

        let config: EngineConfig = load_json(file.path()).unwrap();
        assert_eq!(config.min_training_points_per_cluster, 10);
        assert_eq!(config.seed, 7);
        assert_eq!(config.kmeans_iterations, EngineConfig::default().kmeans_iterations);
    }

    #[test]
    fn test_load_index_spec() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"strategy": "clustered-flat", "cluster_count": 4, "probe_count": 2}}"#
        )
        .unwrap();

        let spec: IndexSpec = load_json(file.path()).unwrap();
        assert_eq!(spec, IndexSpec::clustered_flat(4, 2));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_table(&missing), Err(Error::Io(_))));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "[{").unwrap();
        assert!(matches!(load_table(&broken), Err(Error::Json(_))));
    }

    #[test]
    fn test_load_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        fs::write(&path, r#"[{"name": "a", "energy": 0.5}, {"name": "b", "energy": 0.7}]"#).unwrap();
        let table = load_table(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.numeric_columns_except(DESCRIPTIVE_FIELDS), vec!["energy"]);
    }

    #[test]
    fn test_default_specs_validate() {
        let factory = IndexFactory::default();
        for kind in IndexKind::ALL {
            let spec = default_spec(kind, 500, 8, &factory);
            assert_eq!(spec.kind(), kind);
            factory.validate(500, 8, &spec).unwrap();
        }
    }
}
