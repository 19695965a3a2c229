// Composition tests — the whole path from word lists on disk to a stored
// model and back to scores.
//
//   data dir -> ExtractorConfig + TrainingSet -> Trainer -> ArtifactStore
//            -> ScoringDispatcher::from_store -> probabilities -> tiers
//
// Uses a temporary directory and an in-memory SQLite store.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use phishstream::classifier::training::{Trainer, TrainingSet};
use phishstream::classifier::{LogisticRegression, ProbabilityModel};
use phishstream::config::Config;
use phishstream::db::{self, ModelArtifact};
use phishstream::features::{FeatureRegistry, FeatureVectorBuilder};
use phishstream::scoring::{ScoringDispatcher, TierSet};

const PHISHING: &[&str] = &[
    "secure-login-paypal.tk",
    "paypal-account-verify.tk",
    "apple-id-secure.tk",
    "login-secure-update.tk",
    "verify-account-login.tk",
    "signin-paypal-secure.tk",
    "pavpal-login.tk",
    "appie-account-verify.tk",
    "secure-google-login.tk",
    "account-verify-apple.tk",
    "paypa1-secure-signin.tk",
    "login-apple-verify.tk",
];

const BENIGN: &[&str] = &[
    "google.com",
    "mail.google.com",
    "apple.com",
    "paypal.com",
    "github.com",
    "wikipedia.org",
    "mozilla.org",
    "reddit.com",
    "espn.com",
    "nytimes.com",
    "python.org",
    "stackoverflow.com",
];

fn write_list(root: &Path, dir: &str, entries: &[&str]) {
    let dir = root.join(dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("list.txt"), entries.join("\n")).unwrap();
}

/// A data directory laid out the way `phishstream train` expects.
fn data_dir() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_list(root, "tlds", &["com", "net", "org", "tk"]);
    write_list(root, "targeted_brands", &["paypal", "google", "apple"]);
    write_list(root, "keywords", &["secure", "login", "account", "verify"]);
    write_list(root, "fqdn_keywords", &["login", "secure", "signin"]);
    write_list(root, "similarity_words", &["paypal", "apple"]);
    write_list(root, "benign", BENIGN);
    write_list(root, "malicious", PHISHING);
    tmp
}

fn config_for(dir: &Path) -> Config {
    let data_dir = dir.to_string_lossy().into_owned();
    Config::from_vars(|key| (key == "PHISHSTREAM_DATA_DIR").then(|| data_dir.clone())).unwrap()
}

fn train(dir: &Path, name: &str) -> ModelArtifact {
    let config = config_for(dir);
    let registry = FeatureRegistry::with_default_extractors(config.extractor_config().unwrap()).unwrap();
    let builder = FeatureVectorBuilder::new(Arc::new(registry));
    let set = TrainingSet::load(&config.data_dir).unwrap();
    Trainer::new(builder, LogisticRegression::default())
        .train(name, &set)
        .unwrap()
        .artifact
}

// ============================================================
// Chain: lists -> training -> scoring
// ============================================================

#[test]
fn toy_model_separates_typosquats_from_clean_names() {
    let dir = data_dir();
    let artifact = train(dir.path(), "toy");
    let dispatcher = ScoringDispatcher::from_artifact(&artifact).unwrap();

    let scores = dispatcher.score(&["pavpal-secure-login.tk", "www.google.com"]);
    assert!(scores[0] > 0.5, "typosquat scored {}", scores[0]);
    assert!(scores[1] < 0.5, "clean host scored {}", scores[1]);
}

#[test]
fn training_metrics_describe_the_data() {
    let dir = data_dir();
    let artifact = train(dir.path(), "toy");
    let info = &artifact.metrics.info;

    assert_eq!(info.algorithm, "LogisticRegression");
    assert_eq!(info.benign_samples, BENIGN.len());
    assert_eq!(info.phishing_samples, PHISHING.len());
    assert_eq!(info.feature_vector_size, artifact.extractor.feature_names.len());
    assert_eq!(info.parameters["C"], 10.0);

    let m = artifact.metrics.accuracy.confusion_matrix;
    // 25% of 24 hosts held out
    assert_eq!(m.total(), 6);
    assert!(artifact.metrics.accuracy.training_set_accuracy > 0.9);
}

#[test]
fn training_is_reproducible() {
    let dir = data_dir();
    let a = train(dir.path(), "a");
    let b = train(dir.path(), "b");
    assert_eq!(a.classifier, b.classifier);
    assert_eq!(a.metrics.accuracy, b.metrics.accuracy);
    assert_eq!(a.extractor, b.extractor);
}

#[test]
fn flagged_scores_map_to_default_tiers() {
    let dir = data_dir();
    let dispatcher = ScoringDispatcher::from_artifact(&train(dir.path(), "toy")).unwrap();
    let tiers = TierSet::default();

    let clean = dispatcher.score(&["www.google.com"])[0];
    assert!(clean < 0.5);
    assert!(tiers.evaluate(clean).is_none());
}

// ============================================================
// Chain: store -> dispatcher
// ============================================================

#[tokio::test]
async fn stored_model_scores_like_the_trained_one() {
    let dir = data_dir();
    let artifact = train(dir.path(), "toy");
    let store = db::open_in_memory().unwrap();
    store.put(&artifact).await.unwrap();
    store.set_active("toy").await.unwrap();

    let fresh = ScoringDispatcher::from_artifact(&artifact).unwrap();
    let loaded = ScoringDispatcher::from_store(store.as_ref(), None).await.unwrap();

    let hosts = ["pavpal-secure-login.tk", "www.google.com", "example.org"];
    assert_eq!(fresh.score(&hosts), loaded.score(&hosts));
    assert_eq!(loaded.model().algorithm(), "LogisticRegression");
}

#[tokio::test]
async fn duplicate_model_name_is_rejected() {
    let dir = data_dir();
    let artifact = train(dir.path(), "toy");
    let store = db::open_in_memory().unwrap();
    store.put(&artifact).await.unwrap();
    assert!(store.put(&artifact).await.is_err());
    assert_eq!(store.list_names().await.unwrap(), vec!["toy"]);
}

#[tokio::test]
async fn missing_model_fails_with_remediation_hint() {
    let store = db::open_in_memory().unwrap();

    let err = ScoringDispatcher::from_store(store.as_ref(), None)
        .await
        .err()
        .expect("no active model must fail");
    assert!(err.to_string().contains("phishstream train"), "{err}");

    let err = ScoringDispatcher::from_store(store.as_ref(), Some("ghost"))
        .await
        .err()
        .expect("unknown model must fail");
    assert!(err.to_string().contains("ghost"), "{err}");
}

#[tokio::test]
async fn sqlite_file_store_survives_reopen() {
    let dir = data_dir();
    let artifact = train(dir.path(), "toy");
    let db_dir = tempfile::tempdir().unwrap();
    let db_path = db_dir.path().join("nested").join("phishstream.db");
    let db_path = db_path.to_string_lossy();

    db::initialize(&db_path).unwrap();
    {
        let store = db::open_store(&db_path).unwrap();
        store.put(&artifact).await.unwrap();
        store.set_active("toy").await.unwrap();
    }

    let store = db::open_store(&db_path).unwrap();
    assert_eq!(store.get_active().await.unwrap().as_deref(), Some("toy"));
    assert_eq!(store.get("toy").await.unwrap(), Some(artifact));
    assert!(store.delete("toy").await.unwrap());
    assert_eq!(store.get_active().await.unwrap(), None);
}

// ============================================================
// Shape mismatches fail before scoring
// ============================================================

#[test]
fn edited_lists_without_retraining_fail_fast() {
    let dir = data_dir();
    let mut artifact = train(dir.path(), "toy");

    // Lists changed and fingerprint refreshed: the rebuilt columns differ.
    artifact.extractor.config.tlds.push("xyz".into());
    artifact.extractor.config_fingerprint = artifact.extractor.config.fingerprint();
    let err = ScoringDispatcher::from_artifact(&artifact).err().expect("layout mismatch");
    assert!(err.to_string().contains("does not match"), "{err}");
}

#[test]
fn tampered_configuration_fails_fingerprint_check() {
    let dir = data_dir();
    let mut artifact = train(dir.path(), "toy");
    artifact.extractor.config.keywords.push("bank".into());
    let err = ScoringDispatcher::from_artifact(&artifact).err().expect("fingerprint mismatch");
    assert!(err.to_string().contains("fingerprint"), "{err}");
}

#[test]
fn classifier_width_mismatch_fails_fast() {
    let dir = data_dir();
    let mut artifact = train(dir.path(), "toy");
    if let Some(weights) = artifact.classifier["weights"].as_array_mut() {
        weights.pop();
    }
    assert!(ScoringDispatcher::from_artifact(&artifact).is_err());
}

#[test]
fn duplicate_list_entries_in_programmatic_config_fail_registry() {
    let dir = data_dir();
    let mut config = config_for(dir.path()).extractor_config().unwrap();
    config.brands.push("paypal".into());
    let err = FeatureRegistry::with_default_extractors(config)
        .err()
        .expect("collision must fail");
    assert!(err.to_string().contains("paypal_brand"), "{err}");
}
