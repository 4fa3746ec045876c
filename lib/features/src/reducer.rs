//! Feature reducer
//!
//! Standardize the selected numeric columns, then project onto the leading
//! principal components. The fitted state is kept so later rows land in
//! the same embedding space.

use crate::pca::Pca;
use crate::scaler::StandardScaler;
use crate::table::FeatureTable;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use tracing::{debug, info, warn};
use tracklist_core::{EmbeddedCorpus, Error, Result, SpaceId, Vector};

/// Reduction request: which columns, and how many output dimensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureReducer {
    feature_names: Vec<String>,
    target_dim: usize,
}

impl FeatureReducer {
    /// Validate a request. `target_dim` must be in `1..=feature_names.len()`
    /// and feature names must be unique.
    pub fn new<I, S>(feature_names: I, target_dim: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let feature_names: Vec<String> = feature_names.into_iter().map(Into::into).collect();
        if feature_names.is_empty() {
            return Err(Error::Configuration(
                "at least one feature column is required".to_string(),
            ));
        }
        if target_dim == 0 || target_dim > feature_names.len() {
            return Err(Error::Configuration(format!(
                "target dimension {} must be between 1 and {}",
                target_dim,
                feature_names.len()
            )));
        }
        let mut seen = HashSet::with_capacity(feature_names.len());
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(Error::Configuration(format!(
                    "feature column '{}' listed twice",
                    name
                )));
            }
        }
        Ok(Self {
            feature_names,
            target_dim,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    /// Fit scaler and projection on a table
    pub fn fit(&self, table: &FeatureTable) -> Result<FittedReducer> {
        self.fit_matrix(table).map(|(fitted, _)| fitted)
    }

    /// Fit on a table and embed every row of it
    pub fn fit_transform(&self, table: &FeatureTable) -> Result<(FittedReducer, EmbeddedCorpus)> {
        let (fitted, scaled) = self.fit_matrix(table)?;
        let corpus = fitted.project_scaled(&scaled)?;
        Ok((fitted, corpus))
    }

    /// Returns the fitted reducer and the standardized matrix it was fitted on
    fn fit_matrix(&self, table: &FeatureTable) -> Result<(FittedReducer, Vec<f64>)> {
        if table.is_empty() {
            return Err(Error::Data {
                row: 0,
                column: String::new(),
                reason: "feature table has no rows".to_string(),
            });
        }

        let dim = self.feature_names.len();
        let mut matrix = table.numeric_matrix(&self.feature_names)?;

        let scaler = StandardScaler::fit(&matrix, dim);
        for col in scaler.constant_columns() {
            warn!(
                "Feature column '{}' has zero variance; its standardized value is 0",
                self.feature_names[col]
            );
        }
        scaler.transform(&mut matrix);

        let pca = Pca::fit(&matrix, dim, self.target_dim);
        let ratio = pca.explained_variance_ratio();
        info!(
            "Reduced {} rows from {} features to {} dimensions ({:.1}% variance kept)",
            table.len(),
            dim,
            self.target_dim,
            ratio.iter().sum::<f64>() * 100.0
        );
        debug!("Explained variance ratio: {:?}", ratio);

        let space = space_of(&self.feature_names, &scaler, &pca);
        let fitted = FittedReducer {
            feature_names: self.feature_names.clone(),
            scaler,
            pca,
            space,
        };
        Ok((fitted, matrix))
    }
}

/// Fingerprint of everything that determines where a row lands
fn space_of(names: &[String], scaler: &StandardScaler, pca: &Pca) -> SpaceId {
    let mut hasher = DefaultHasher::new();
    names.hash(&mut hasher);
    pca.n_components().hash(&mut hasher);
    for value in scaler
        .means()
        .iter()
        .chain(scaler.scales())
        .chain(pca.components())
    {
        value.to_bits().hash(&mut hasher);
    }
    SpaceId::new(hasher.finish())
}

/// Scaler and projection fitted on one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedReducer {
    feature_names: Vec<String>,
    scaler: StandardScaler,
    pca: Pca,
    space: SpaceId,
}

impl FittedReducer {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn input_dim(&self) -> usize {
        self.feature_names.len()
    }

    pub fn target_dim(&self) -> usize {
        self.pca.n_components()
    }

    pub fn space_id(&self) -> SpaceId {
        self.space
    }

    pub fn explained_variance(&self) -> &[f64] {
        self.pca.explained_variance()
    }

    pub fn explained_variance_ratio(&self) -> Vec<f64> {
        self.pca.explained_variance_ratio()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn pca(&self) -> &Pca {
        &self.pca
    }

    /// Embed every row of a table into the fitted space
    pub fn transform(&self, table: &FeatureTable) -> Result<EmbeddedCorpus> {
        let mut matrix = table.numeric_matrix(&self.feature_names)?;
        self.scaler.transform(&mut matrix);
        self.project_scaled(&matrix)
    }

    /// Embed one raw feature row, columns in `feature_names` order
    pub fn transform_row(&self, raw: &[f64]) -> Result<Vector> {
        if raw.len() != self.input_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.input_dim(),
                actual: raw.len(),
            });
        }
        if let Some(col) = raw.iter().position(|x| !x.is_finite()) {
            return Err(Error::Data {
                row: 0,
                column: self.feature_names[col].clone(),
                reason: "number is not finite".to_string(),
            });
        }
        let mut row = raw.to_vec();
        self.scaler.transform_row(&mut row);
        Ok(Vector::new(
            self.pca.project(&row).into_iter().map(|x| x as f32).collect(),
        ))
    }

    fn project_scaled(&self, matrix: &[f64]) -> Result<EmbeddedCorpus> {
        let dim = self.input_dim();
        let target = self.target_dim();
        let mut data = Vec::with_capacity(matrix.len() / dim * target);
        for row in matrix.chunks_exact(dim) {
            data.extend(self.pca.project(row).into_iter().map(|x| x as f32));
        }
        EmbeddedCorpus::with_space(data, target, self.space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tracks(n: usize) -> FeatureTable {
        FeatureTable::new(
            (0..n)
                .map(|i| {
                    let t = i as f64;
                    json!({
                        "name": format!("Track {}", i),
                        "energy": (t * 0.37).sin(),
                        "tempo": 90.0 + (t * 7.0) % 60.0,
                        "valence": (t * 0.11).cos() * 0.5,
                        "mode": 1,
                    })
                })
                .collect(),
        )
    }

    fn names() -> Vec<&'static str> {
        vec!["energy", "tempo", "valence", "mode"]
    }

    #[test]
    fn test_reducer_validation() {
        assert!(matches!(
            FeatureReducer::new(names(), 0),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            FeatureReducer::new(names(), 5),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            FeatureReducer::new(Vec::<String>::new(), 1),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            FeatureReducer::new(vec!["a", "a"], 1),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_fit_transform_shape() {
        let reducer = FeatureReducer::new(names(), 2).unwrap();
        let (fitted, corpus) = reducer.fit_transform(&tracks(40)).unwrap();
        assert_eq!(corpus.len(), 40);
        assert_eq!(corpus.dim(), 2);
        assert_eq!(corpus.space(), fitted.space_id());
        assert_eq!(fitted.target_dim(), 2);
        assert_eq!(fitted.explained_variance().len(), 2);
    }

    #[test]
    fn test_constant_column_is_ignored() {
        let reducer = FeatureReducer::new(names(), 4).unwrap();
        let (fitted, _) = reducer.fit_transform(&tracks(30)).unwrap();
        // "mode" is constant, so one component carries no variance
        let ev = fitted.explained_variance();
        assert!(ev[3].abs() < 1e-9);
    }

    #[test]
    fn test_transform_row_matches_corpus() {
        let table = tracks(25);
        let reducer = FeatureReducer::new(names(), 3).unwrap();
        let (fitted, corpus) = reducer.fit_transform(&table).unwrap();

        let raw: Vec<f64> = names()
            .iter()
            .map(|c| table.numeric(7, c).unwrap())
            .collect();
        let v = fitted.transform_row(&raw).unwrap();
        for (a, b) in v.as_slice().iter().zip(corpus.row(7).unwrap()) {
            assert!((a - b).abs() < 1e-5);
        }

        assert!(fitted.transform_row(&[1.0]).unwrap_err().is_dimension_mismatch());
        assert!(matches!(
            fitted.transform_row(&[f64::NAN, 0.0, 0.0, 0.0]),
            Err(Error::Data { .. })
        ));
    }

    #[test]
    fn test_bad_rows_are_data_errors() {
        let mut rows = tracks(5).rows().to_vec();
        rows[3]["tempo"] = json!("allegro");
        let reducer = FeatureReducer::new(names(), 2).unwrap();
        match reducer.fit(&FeatureTable::new(rows)) {
            Err(Error::Data { row, column, .. }) => {
                assert_eq!(row, 3);
                assert_eq!(column, "tempo");
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            reducer.fit(&FeatureTable::default()),
            Err(Error::Data { .. })
        ));
    }

    #[test]
    fn test_refit_is_deterministic() {
        let table = tracks(30);
        let reducer = FeatureReducer::new(names(), 2).unwrap();
        let (a, ca) = reducer.fit_transform(&table).unwrap();
        let (b, cb) = reducer.fit_transform(&table).unwrap();
        assert_eq!(a.space_id(), b.space_id());
        assert_eq!(ca.as_slice(), cb.as_slice());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_reduction_is_deterministic(values in proptest::collection::vec(-100.0f64..100.0, 12..60)) {
                let rows = values
                    .chunks_exact(3)
                    .map(|r| json!({"a": r[0], "b": r[1], "c": r[2]}))
                    .collect();
                let table = FeatureTable::new(rows);
                let reducer = FeatureReducer::new(["a", "b", "c"], 2).unwrap();
                let (a, ca) = reducer.fit_transform(&table).unwrap();
                let (b, cb) = reducer.fit_transform(&table).unwrap();
                prop_assert_eq!(a.space_id(), b.space_id());
                prop_assert_eq!(ca.as_slice(), cb.as_slice());
                prop_assert!(ca.as_slice().iter().all(|x| x.is_finite()));
            }
        }
    }
}
