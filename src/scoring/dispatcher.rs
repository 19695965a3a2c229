// Scoring dispatcher — hostnames in, one probability per host out.
//
// Failure policy, in order of blast radius:
//   - a host that cannot be parsed scores 0 and is logged; its siblings are
//     scored normally;
//   - a model failure scores the whole batch 0 and is logged with the batch
//     context; the caller moves on to the next batch.
// Neither case returns an error. Shape problems are caught earlier, when the
// dispatcher is constructed, so they never reach this path.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::classifier::{self, ProbabilityModel};
use crate::db::models::ModelArtifact;
use crate::db::ArtifactStore;
use crate::features::{FeatureMatrix, FeatureRegistry, FeatureVectorBuilder};

/// Score substituted for hosts that could not be scored.
pub const NEUTRAL_SCORE: f64 = 0.0;

#[derive(Clone)]
pub struct ScoringDispatcher {
    builder: FeatureVectorBuilder,
    model: Arc<dyn ProbabilityModel>,
}

impl ScoringDispatcher {
    /// Pair a vector builder with a model. Fails if their widths differ.
    pub fn new(builder: FeatureVectorBuilder, model: Arc<dyn ProbabilityModel>) -> Result<Self> {
        if model.input_width() != builder.width() {
            anyhow::bail!(
                "Model expects {} features but the extractor configuration produces {}. \
                 Retrain the model with the current lists.",
                model.input_width(),
                builder.width()
            );
        }
        Ok(Self { builder, model })
    }

    /// Rebuild the exact training-time pipeline from a stored artifact.
    ///
    /// Fails fast when the stored configuration was altered, when the
    /// reloaded extractors produce different column names, or when the
    /// classifier was trained on a different width.
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self> {
        let state = &artifact.extractor;
        let fingerprint = state.config.fingerprint();
        if fingerprint != state.config_fingerprint {
            anyhow::bail!(
                "Model '{}' has a corrupted extractor configuration (fingerprint mismatch)",
                artifact.name
            );
        }

        let registry = FeatureRegistry::with_default_extractors(state.config.clone())
            .with_context(|| format!("Failed to rebuild extractors for model '{}'", artifact.name))?;

        if registry.feature_names() != state.feature_names.as_slice() {
            let first_diff = registry
                .feature_names()
                .iter()
                .zip(&state.feature_names)
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| registry.width().min(state.feature_names.len()));
            anyhow::bail!(
                "Feature layout of model '{}' does not match the extractors \
                 ({} stored columns, {} rebuilt, first difference at column {first_diff})",
                artifact.name,
                state.feature_names.len(),
                registry.width()
            );
        }

        let model = classifier::restore(&artifact.classifier)
            .with_context(|| format!("Failed to restore classifier of model '{}'", artifact.name))?;

        Self::new(FeatureVectorBuilder::new(Arc::new(registry)), model)
            .with_context(|| format!("Model '{}' cannot be used for scoring", artifact.name))
    }

    /// Load the selected model from `store` and build its dispatcher.
    ///
    /// `name` overrides the stored active selection. A missing model is a
    /// configuration error; nothing is retried.
    pub async fn from_store(store: &dyn ArtifactStore, name: Option<&str>) -> Result<Self> {
        let name = match name {
            Some(n) => n.to_string(),
            None => store.get_active().await?.ok_or_else(|| {
                anyhow::anyhow!(
                    "No model selected for scoring. Run `phishstream train --name <name> --activate`, \
                     or `phishstream activate <name>` to pick a stored model."
                )
            })?,
        };

        let artifact = store.get(&name).await?.ok_or_else(|| {
            anyhow::anyhow!(
                "Model '{name}' not found. Run `phishstream models` to list stored models, \
                 or `phishstream train --name {name}` to create it."
            )
        })?;

        info!(model = name.as_str(), columns = artifact.extractor.feature_names.len(), "Loaded model");
        Self::from_artifact(&artifact)
    }

    pub fn builder(&self) -> &FeatureVectorBuilder {
        &self.builder
    }

    pub fn model(&self) -> &dyn ProbabilityModel {
        self.model.as_ref()
    }

    /// Score without the failure policy: any bad host or model error is returned.
    pub fn try_score<S: AsRef<str>>(&self, hosts: &[S]) -> Result<Vec<f64>> {
        let set = self.builder.build(hosts, false)?;
        self.model.predict_probability(&set.values)
    }

    /// Score a batch that has no identifier (manual checks, tests).
    pub fn score<S: AsRef<str>>(&self, hosts: &[S]) -> Vec<f64> {
        self.score_batch(0, hosts)
    }

    /// Score `hosts` with the neutral-score failure policy.
    ///
    /// Always returns exactly one value in [0, 1] per input host, same order.
    pub fn score_batch<S: AsRef<str>>(&self, batch: u64, hosts: &[S]) -> Vec<f64> {
        let mut scores = vec![NEUTRAL_SCORE; hosts.len()];
        let mut matrix = FeatureMatrix::with_columns(self.builder.width());
        let mut scored = Vec::with_capacity(hosts.len());

        for (i, raw) in hosts.iter().enumerate() {
            let raw = raw.as_ref();
            match self.builder.vector(raw).and_then(|row| matrix.push_row(&row)) {
                Ok(()) => scored.push(i),
                Err(e) => warn!(batch, host = raw, error = %e, "Feature extraction failed, scoring neutral"),
            }
        }

        if scored.is_empty() {
            return scores;
        }

        let probabilities = match self.model.predict_probability(&matrix) {
            Ok(p) if p.len() == scored.len() => p,
            Ok(p) => {
                error!(
                    batch,
                    hosts = hosts.len(),
                    expected = scored.len(),
                    returned = p.len(),
                    "Model returned the wrong number of probabilities, scoring batch neutral"
                );
                return scores;
            }
            Err(e) => {
                error!(
                    batch,
                    hosts = hosts.len(),
                    first_host = hosts.first().map(|h| h.as_ref()).unwrap_or_default(),
                    error = %e,
                    "Prediction failed, scoring batch neutral"
                );
                return scores;
            }
        };

        for (i, p) in scored.into_iter().zip(probabilities) {
            scores[i] = if p.is_finite() {
                p.clamp(0.0, 1.0)
            } else {
                NEUTRAL_SCORE
            };
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::features::ExtractorConfig;

    struct Fixed(usize, f64);

    impl ProbabilityModel for Fixed {
        fn algorithm(&self) -> &'static str {
            "Fixed"
        }
        fn input_width(&self) -> usize {
            self.0
        }
        fn predict_probability(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
            Ok(vec![self.1; features.rows()])
        }
        fn to_state(&self) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    struct Broken(usize);

    impl ProbabilityModel for Broken {
        fn algorithm(&self) -> &'static str {
            "Broken"
        }
        fn input_width(&self) -> usize {
            self.0
        }
        fn predict_probability(&self, _features: &FeatureMatrix) -> Result<Vec<f64>> {
            anyhow::bail!("model exploded")
        }
        fn to_state(&self) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    fn builder() -> FeatureVectorBuilder {
        let config = ExtractorConfig {
            tlds: vec!["com".into()],
            ..Default::default()
        };
        FeatureVectorBuilder::new(Arc::new(
            FeatureRegistry::with_default_extractors(config).unwrap(),
        ))
    }

    #[test]
    fn test_width_mismatch_fails_construction() {
        let b = builder();
        let width = b.width();
        assert!(ScoringDispatcher::new(b, Arc::new(Fixed(width + 1, 0.5))).is_err());
    }

    #[test]
    fn test_bad_host_scores_neutral_siblings_unaffected() {
        let b = builder();
        let width = b.width();
        let d = ScoringDispatcher::new(b, Arc::new(Fixed(width, 0.8))).unwrap();
        assert_eq!(d.score(&["good.com", "", "other.com"]), vec![0.8, 0.0, 0.8]);
    }

    #[test]
    fn test_model_failure_scores_whole_batch_neutral() {
        let b = builder();
        let width = b.width();
        let d = ScoringDispatcher::new(b, Arc::new(Broken(width))).unwrap();
        assert_eq!(d.score_batch(7, &["a.com", "b.com"]), vec![0.0, 0.0]);
        assert!(d.try_score(&["a.com"]).is_err());
    }

    #[test]
    fn test_out_of_range_probabilities_are_clamped() {
        let b = builder();
        let width = b.width();
        let high = ScoringDispatcher::new(b.clone(), Arc::new(Fixed(width, 1.7))).unwrap();
        assert_eq!(high.score(&["a.com"]), vec![1.0]);
        let nan = ScoringDispatcher::new(b, Arc::new(Fixed(width, f64::NAN))).unwrap();
        assert_eq!(nan.score(&["a.com"]), vec![0.0]);
    }
}
