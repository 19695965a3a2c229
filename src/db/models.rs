// Data models — what a trained model looks like at rest.
//
// An artifact bundles everything inference needs to rebuild the exact vector
// shape training used: the extractor lists, the frozen column names, and a
// fingerprint of the lists. The classifier itself is opaque JSON, tagged with
// its algorithm so `classifier::restore` can pick the right loader.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classifier::metrics::ModelMetrics;
use crate::features::ExtractorConfig;

/// Extractor side of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorState {
    pub config: ExtractorConfig,
    /// Column names in vector order at training time.
    pub feature_names: Vec<String>,
    /// `ExtractorConfig::fingerprint` at training time.
    pub config_fingerprint: String,
}

/// A named, persisted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub extractor: ExtractorState,
    pub classifier: Value,
    pub metrics: ModelMetrics,
    pub created_at: String,
}

/// One row of `phishstream models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub algorithm: String,
    pub test_set_accuracy: f64,
    pub created_at: String,
    pub active: bool,
}

impl ModelArtifact {
    pub fn summary(&self, active: bool) -> ModelSummary {
        ModelSummary {
            name: self.name.clone(),
            algorithm: self.metrics.info.algorithm.clone(),
            test_set_accuracy: self.metrics.accuracy.test_set_accuracy,
            created_at: self.created_at.clone(),
            active,
        }
    }
}
