// L2-regularised logistic regression — the default classifier.
//
// Plain batch gradient descent on the mean log-loss with a fixed step of
// 1/L, where L bounds the curvature of the objective. That step size never
// overshoots, so training converges without tuning a learning rate per
// dataset. Weights start at zero, making fits fully deterministic.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::traits::{Classifier, ProbabilityModel};
use crate::features::FeatureMatrix;

pub const ALGORITHM: &str = "LogisticRegression";

/// Hyperparameters for `LogisticModel` fitting.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// Inverse regularisation strength (larger = weaker penalty).
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the largest gradient component falls below this.
    pub tolerance: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 10.0,
            max_iter: 2000,
            tolerance: 1e-6,
        }
    }
}

/// Fitted weights. The intercept is not regularised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub algorithm: String,
    pub weights: Vec<f64>,
    pub intercept: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticModel {
    pub fn from_state(state: &Value) -> Result<Self> {
        let model: Self = serde_json::from_value(state.clone())
            .context("Classifier state is not a logistic regression model")?;
        if model.algorithm != ALGORITHM {
            anyhow::bail!("Expected {ALGORITHM} state, found '{}'", model.algorithm);
        }
        Ok(model)
    }

    fn decision(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl ProbabilityModel for LogisticModel {
    fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    fn input_width(&self) -> usize {
        self.weights.len()
    }

    fn predict_probability(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        if features.columns() != self.weights.len() && !features.is_empty() {
            anyhow::bail!(
                "Model expects {} features, got {}",
                self.weights.len(),
                features.columns()
            );
        }
        Ok(features
            .iter_rows()
            .map(|row| sigmoid(self.decision(row)))
            .collect())
    }

    fn to_state(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Classifier for LogisticRegression {
    type Model = LogisticModel;

    fn parameters(&self) -> Value {
        json!({
            "C": self.c,
            "max_iter": self.max_iter,
            "tolerance": self.tolerance,
        })
    }

    fn fit(&self, features: &FeatureMatrix, labels: &[f64]) -> Result<LogisticModel> {
        let n = features.rows();
        let d = features.columns();
        if n == 0 {
            anyhow::bail!("Cannot fit a classifier on an empty training set");
        }
        if labels.len() != n {
            anyhow::bail!("{} labels for {n} training rows", labels.len());
        }
        if labels.iter().any(|&y| y != 0.0 && y != 1.0) {
            anyhow::bail!("Labels must be 0 (benign) or 1 (phishing)");
        }
        if self.c <= 0.0 {
            anyhow::bail!("C must be positive, got {}", self.c);
        }

        let n_f = n as f64;
        let reg = 1.0 / (self.c * n_f);

        // Curvature bound: 0.25 * max ||[x, 1]||^2 for the loss, plus the penalty.
        let max_norm_sq = features
            .iter_rows()
            .map(|row| 1.0 + row.iter().map(|x| x * x).sum::<f64>())
            .fold(0.0f64, f64::max);
        let step = 1.0 / (0.25 * max_norm_sq + reg);

        let mut weights = vec![0.0; d];
        let mut intercept = 0.0;
        let mut grad_w = vec![0.0; d];
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;
            grad_w.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;

            for (row, &y) in features.iter_rows().zip(labels) {
                let z = intercept + weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>();
                let err = sigmoid(z) - y;
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += err * x;
                }
                grad_b += err;
            }

            let mut largest = (grad_b / n_f).abs();
            for (g, w) in grad_w.iter_mut().zip(&weights) {
                *g = *g / n_f + reg * w;
                largest = largest.max(g.abs());
            }
            if largest < self.tolerance {
                break;
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= step * g;
            }
            intercept -= step * grad_b / n_f;
        }

        debug!(rows = n, columns = d, iterations, "Fitted logistic regression");

        Ok(LogisticModel {
            algorithm: ALGORITHM.to_string(),
            weights,
            intercept,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (FeatureMatrix, Vec<f64>) {
        let rows = vec![
            vec![0.0, 1.0],
            vec![0.0, 2.0],
            vec![0.0, 1.5],
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![1.5, 0.5],
        ];
        let labels = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (FeatureMatrix::from_rows(&rows).unwrap(), labels)
    }

    #[test]
    fn test_fit_separates_linearly_separable_data() {
        let (x, y) = separable();
        let model = LogisticRegression::default().fit(&x, &y).unwrap();
        let probs = model.predict_probability(&x).unwrap();
        for (p, label) in probs.iter().zip(&y) {
            if *label == 1.0 {
                assert!(*p > 0.5, "positive row scored {p}");
            } else {
                assert!(*p < 0.5, "negative row scored {p}");
            }
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = separable();
        let a = LogisticRegression::default().fit(&x, &y).unwrap();
        let b = LogisticRegression::default().fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fit_rejects_bad_labels() {
        let (x, _) = separable();
        assert!(LogisticRegression::default().fit(&x, &[0.0; 3]).is_err());
        assert!(LogisticRegression::default()
            .fit(&x, &[0.0, 2.0, 0.0, 1.0, 1.0, 1.0])
            .is_err());
    }

    #[test]
    fn test_state_round_trip_and_width_check() {
        let (x, y) = separable();
        let model = LogisticRegression::default().fit(&x, &y).unwrap();
        let restored = LogisticModel::from_state(&model.to_state().unwrap()).unwrap();
        assert_eq!(model, restored);

        let wrong = FeatureMatrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(restored.predict_probability(&wrong).is_err());
    }
}
