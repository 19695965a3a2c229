// Training metrics — how well a freshly fitted model separates the held-out set.
//
// Everything is computed at the 0.5 decision threshold except ROC AUC,
// which uses the full probability ranking.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Threshold above which a probability counts as a phishing prediction.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Metadata and accuracy figures stored with every trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub info: TrainingInfo,
    pub accuracy: AccuracyMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingInfo {
    pub algorithm: String,
    pub parameters: Value,
    pub training_date: String,
    pub benign_samples: usize,
    pub phishing_samples: usize,
    pub feature_vector_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub training_set_accuracy: f64,
    pub test_set_accuracy: f64,
    pub true_positive_rate: f64,
    pub false_positive_rate: f64,
    pub precision: f64,
    pub recall: f64,
    pub auc_score: f64,
    pub confusion_matrix: ConfusionMatrix,
}

/// Binary confusion counts. Serialized as `[[tn, fp], [fn, tp]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[[usize; 2]; 2]", into = "[[usize; 2]; 2]")]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

impl From<[[usize; 2]; 2]> for ConfusionMatrix {
    fn from(m: [[usize; 2]; 2]) -> Self {
        Self {
            true_negatives: m[0][0],
            false_positives: m[0][1],
            false_negatives: m[1][0],
            true_positives: m[1][1],
        }
    }
}

impl From<ConfusionMatrix> for [[usize; 2]; 2] {
    fn from(c: ConfusionMatrix) -> Self {
        [
            [c.true_negatives, c.false_positives],
            [c.false_negatives, c.true_positives],
        ]
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ConfusionMatrix {
    pub fn at_threshold(labels: &[f64], probabilities: &[f64], threshold: f64) -> Self {
        let mut m = Self::default();
        for (&y, &p) in labels.iter().zip(probabilities) {
            match (y == 1.0, p > threshold) {
                (false, false) => m.true_negatives += 1,
                (false, true) => m.false_positives += 1,
                (true, false) => m.false_negatives += 1,
                (true, true) => m.true_positives += 1,
            }
        }
        m
    }

    pub fn total(&self) -> usize {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_negatives + self.true_positives, self.total())
    }

    pub fn true_positive_rate(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn false_positive_rate(&self) -> f64 {
        ratio(self.false_positives, self.false_positives + self.true_negatives)
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }
}

/// Area under the ROC curve via the rank-sum statistic.
///
/// Ties count half. Returns 0.5 when only one class is present.
pub fn roc_auc(labels: &[f64], probabilities: &[f64]) -> f64 {
    let positives: Vec<f64> = labels
        .iter()
        .zip(probabilities)
        .filter(|(y, _)| **y == 1.0)
        .map(|(_, p)| *p)
        .collect();
    let negatives: Vec<f64> = labels
        .iter()
        .zip(probabilities)
        .filter(|(y, _)| **y != 1.0)
        .map(|(_, p)| *p)
        .collect();

    if positives.is_empty() || negatives.is_empty() {
        return 0.5;
    }

    let mut wins = 0.0;
    for p in &positives {
        for n in &negatives {
            if p > n {
                wins += 1.0;
            } else if p == n {
                wins += 0.5;
            }
        }
    }
    wins / (positives.len() * negatives.len()) as f64
}

impl AccuracyMetrics {
    /// Compute every figure from train-set and test-set predictions.
    pub fn compute(
        train_labels: &[f64],
        train_probabilities: &[f64],
        test_labels: &[f64],
        test_probabilities: &[f64],
    ) -> Self {
        let train = ConfusionMatrix::at_threshold(
            train_labels,
            train_probabilities,
            DECISION_THRESHOLD,
        );
        let test =
            ConfusionMatrix::at_threshold(test_labels, test_probabilities, DECISION_THRESHOLD);

        Self {
            training_set_accuracy: train.accuracy(),
            test_set_accuracy: test.accuracy(),
            true_positive_rate: test.true_positive_rate(),
            false_positive_rate: test.false_positive_rate(),
            precision: test.precision(),
            recall: test.true_positive_rate(),
            auc_score: roc_auc(test_labels, test_probabilities),
            confusion_matrix: test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix_counts() {
        let labels = [0.0, 0.0, 1.0, 1.0, 1.0];
        let probs = [0.1, 0.7, 0.9, 0.4, 0.6];
        let m = ConfusionMatrix::at_threshold(&labels, &probs, 0.5);
        assert_eq!(<[[usize; 2]; 2]>::from(m), [[1, 1], [1, 2]]);
        assert!((m.accuracy() - 0.6).abs() < 1e-12);
        assert!((m.precision() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let m = ConfusionMatrix::at_threshold(&[1.0], &[0.5], 0.5);
        assert_eq!(m.false_negatives, 1);
    }

    #[test]
    fn test_auc_perfect_and_inverted() {
        assert_eq!(roc_auc(&[0.0, 1.0], &[0.2, 0.8]), 1.0);
        assert_eq!(roc_auc(&[0.0, 1.0], &[0.8, 0.2]), 0.0);
        assert_eq!(roc_auc(&[1.0, 1.0], &[0.8, 0.2]), 0.5);
    }

    #[test]
    fn test_empty_denominators_are_zero() {
        let m = ConfusionMatrix::default();
        assert_eq!(m.accuracy(), 0.0);
        assert_eq!(m.true_positive_rate(), 0.0);
    }

    #[test]
    fn test_confusion_matrix_serializes_as_nested_array() {
        let m = ConfusionMatrix {
            true_negatives: 5,
            false_positives: 1,
            false_negatives: 2,
            true_positives: 7,
        };
        assert_eq!(serde_json::to_string(&m).unwrap(), "[[5,1],[2,7]]");
    }
}
