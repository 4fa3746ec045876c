use serde::{Deserialize, Serialize};

/// Minimum number of training vectors each cluster of a clustered index needs
pub const DEFAULT_MIN_TRAINING_POINTS_PER_CLUSTER: usize = 39;

/// Lloyd iterations for coarse and product quantizer training
pub const DEFAULT_KMEANS_ITERATIONS: usize = 20;

pub const DEFAULT_SEED: u64 = 0x5eed;

/// Engine-wide constants for index construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub min_training_points_per_cluster: usize,
    pub kmeans_iterations: usize,
    /// Seed for k-means initialization and graph level assignment
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_training_points_per_cluster: DEFAULT_MIN_TRAINING_POINTS_PER_CLUSTER,
            kmeans_iterations: DEFAULT_KMEANS_ITERATIONS,
            seed: DEFAULT_SEED,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"seed": 7}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.min_training_points_per_cluster, 39);
        assert_eq!(config.kmeans_iterations, DEFAULT_KMEANS_ITERATIONS);
    }
}
