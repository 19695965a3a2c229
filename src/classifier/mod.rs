// Classifier — pluggable probability models, training, and metrics.

pub mod logistic;
pub mod metrics;
pub mod training;
pub mod traits;

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

pub use logistic::{LogisticModel, LogisticRegression};
pub use traits::{Classifier, ProbabilityModel};

/// Rebuild a live model from the state stored in an artifact.
pub fn restore(state: &Value) -> Result<Arc<dyn ProbabilityModel>> {
    let algorithm = state
        .get("algorithm")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match algorithm {
        logistic::ALGORITHM => Ok(Arc::new(LogisticModel::from_state(state)?)),
        "" => anyhow::bail!("Classifier state has no algorithm tag"),
        other => anyhow::bail!("Unknown classifier algorithm '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_restore_dispatches_on_algorithm() {
        let state = json!({"algorithm": "LogisticRegression", "weights": [1.0], "intercept": 0.0});
        let model = restore(&state).unwrap();
        assert_eq!(model.algorithm(), "LogisticRegression");
        assert_eq!(model.input_width(), 1);
    }

    #[test]
    fn test_restore_rejects_unknown_algorithm() {
        assert!(restore(&json!({"algorithm": "RandomForest"})).is_err());
        assert!(restore(&json!({})).is_err());
    }
}
