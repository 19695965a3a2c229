// Classifier traits — the swap-ready model abstraction.
//
// The rest of the pipeline only ever sees `ProbabilityModel`: a matrix goes
// in, one phishing probability per row comes out. Fitting lives behind
// `Classifier` so a different algorithm can be dropped in without touching
// feature extraction or scoring.

use anyhow::Result;
use serde_json::Value;

use crate::features::FeatureMatrix;

/// A trained model that turns feature rows into probabilities in [0, 1].
pub trait ProbabilityModel: Send + Sync {
    /// Algorithm name recorded in metrics and persisted state.
    fn algorithm(&self) -> &'static str;

    /// Number of columns the model was trained on.
    fn input_width(&self) -> usize;

    /// Probability of the positive (phishing) class for each row, same order.
    fn predict_probability(&self, features: &FeatureMatrix) -> Result<Vec<f64>>;

    /// Serializable state, restorable with `classifier::restore`.
    fn to_state(&self) -> Result<Value>;
}

/// A learning algorithm that fits a `ProbabilityModel` from labelled rows.
pub trait Classifier {
    type Model: ProbabilityModel + 'static;

    /// Hyperparameters recorded alongside training metrics.
    fn parameters(&self) -> Value;

    /// Fit on `features` with labels 0.0 (benign) / 1.0 (phishing).
    fn fit(&self, features: &FeatureMatrix, labels: &[f64]) -> Result<Self::Model>;
}
