// Training — labelled host lists to a persisted, scored model.
//
// Flow: load benign/ and malicious/ lists → compute feature rows (dropping
// hosts that do not parse) → seeded shuffle and 75/25 split → fit → metrics
// on both halves → package as a ModelArtifact.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use super::metrics::{AccuracyMetrics, ModelMetrics, TrainingInfo};
use super::traits::{Classifier, ProbabilityModel};
use crate::db::models::{ExtractorState, ModelArtifact};
use crate::features::config::load_from_directory;
use crate::features::{FeatureMatrix, FeatureVectorBuilder};

pub const BENIGN_DIR: &str = "benign";
pub const MALICIOUS_DIR: &str = "malicious";

pub const DEFAULT_TEST_FRACTION: f64 = 0.25;
pub const DEFAULT_SEED: u64 = 2;

/// Hosts with their labels: 0.0 benign, 1.0 phishing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub hosts: Vec<String>,
    pub labels: Vec<f64>,
}

impl TrainingSet {
    /// Load `benign/` and `malicious/` under `data_dir`.
    ///
    /// A host listed in both keeps its benign label.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let benign = load_from_directory(&data_dir.join(BENIGN_DIR))
            .context("Failed to load benign training hosts")?;
        let malicious = load_from_directory(&data_dir.join(MALICIOUS_DIR))
            .context("Failed to load malicious training hosts")?;
        Ok(Self::from_lists(benign, malicious))
    }

    pub fn from_lists<I, J>(benign: I, malicious: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        let mut set = Self::default();
        let mut seen = HashSet::new();
        let mut conflicts = 0usize;

        for host in benign {
            if seen.insert(host.clone()) {
                set.hosts.push(host);
                set.labels.push(0.0);
            }
        }
        for host in malicious {
            if seen.insert(host.clone()) {
                set.hosts.push(host);
                set.labels.push(1.0);
            } else {
                conflicts += 1;
            }
        }

        if conflicts > 0 {
            warn!(conflicts, "Hosts listed as both benign and malicious kept as benign");
        }
        set
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn phishing_count(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 1.0).count()
    }

    pub fn benign_count(&self) -> usize {
        self.len() - self.phishing_count()
    }
}

/// Result of a training run: the artifact to persist and the live model.
pub struct TrainedModel<M> {
    pub artifact: ModelArtifact,
    pub model: M,
}

pub struct Trainer<C: Classifier> {
    builder: FeatureVectorBuilder,
    classifier: C,
    test_fraction: f64,
    seed: u64,
    show_progress: bool,
}

impl<C: Classifier> Trainer<C> {
    pub fn new(builder: FeatureVectorBuilder, classifier: C) -> Self {
        Self {
            builder,
            classifier,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            show_progress: false,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    /// Draw a progress bar while computing features (CLI only).
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Fit a model on `set` and package it under `name`.
    pub fn train(&self, name: &str, set: &TrainingSet) -> Result<TrainedModel<C::Model>> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            anyhow::bail!("Test fraction must be in (0, 1), got {}", self.test_fraction);
        }

        let (features, labels) = self.featurize(set)?;
        let phishing = labels.iter().filter(|&&y| y == 1.0).count();
        let benign = labels.len() - phishing;
        if phishing == 0 || benign == 0 {
            anyhow::bail!(
                "Training needs both classes (benign: {benign}, phishing: {phishing})"
            );
        }

        let (train_idx, test_idx) = self.split(labels.len());
        let train_x = features.select_rows(&train_idx);
        let test_x = features.select_rows(&test_idx);
        let train_y: Vec<f64> = train_idx.iter().map(|&i| labels[i]).collect();
        let test_y: Vec<f64> = test_idx.iter().map(|&i| labels[i]).collect();

        info!(
            train = train_idx.len(),
            test = test_idx.len(),
            columns = features.columns(),
            "Fitting classifier"
        );
        let model = self.classifier.fit(&train_x, &train_y)?;

        let accuracy = AccuracyMetrics::compute(
            &train_y,
            &model.predict_probability(&train_x)?,
            &test_y,
            &model.predict_probability(&test_x)?,
        );

        let now = chrono::Utc::now();
        let config = self.builder.registry().config().clone();
        let artifact = ModelArtifact {
            name: name.to_string(),
            extractor: ExtractorState {
                config_fingerprint: config.fingerprint(),
                config,
                feature_names: self.builder.registry().feature_names().to_vec(),
            },
            classifier: model.to_state()?,
            metrics: ModelMetrics {
                info: TrainingInfo {
                    algorithm: model.algorithm().to_string(),
                    parameters: self.classifier.parameters(),
                    training_date: now.format("%Y-%m-%d %H:%M:%S").to_string(),
                    benign_samples: benign,
                    phishing_samples: phishing,
                    feature_vector_size: features.columns(),
                },
                accuracy,
            },
            created_at: now.to_rfc3339(),
        };

        info!(
            name,
            test_accuracy = artifact.metrics.accuracy.test_set_accuracy,
            auc = artifact.metrics.accuracy.auc_score,
            "Training complete"
        );

        Ok(TrainedModel { artifact, model })
    }

    /// Feature rows for every parseable host, with matching labels.
    fn featurize(&self, set: &TrainingSet) -> Result<(FeatureMatrix, Vec<f64>)> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new(set.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar().template("  Features [{bar:30}] {pos}/{len} ({eta})")?,
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut matrix = FeatureMatrix::with_columns(self.builder.width());
        let mut labels = Vec::with_capacity(set.len());
        let mut skipped = 0usize;

        for (host, &label) in set.hosts.iter().zip(&set.labels) {
            match self.builder.vector(host) {
                Ok(row) => {
                    matrix.push_row(&row)?;
                    labels.push(label);
                }
                Err(e) => {
                    warn!(host = host.as_str(), error = %e, "Skipping unparseable training host");
                    skipped += 1;
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if skipped > 0 {
            warn!(skipped, "Some training hosts were skipped");
        }
        if matrix.rows() < 2 {
            anyhow::bail!("Need at least two usable training hosts, got {}", matrix.rows());
        }
        Ok((matrix, labels))
    }

    /// Seeded shuffle, then the first `ceil(n * fraction)` indices are the test set.
    fn split(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let test_len = ((n as f64 * self.test_fraction).ceil() as usize).clamp(1, n - 1);
        let train = indices.split_off(test_len);
        (train, indices)
    }
}
