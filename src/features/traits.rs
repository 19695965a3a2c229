// Feature extractor trait — one heuristic, one or more named columns.
//
// Extractors are registered explicitly with the FeatureRegistry. Adding a
// heuristic means writing one type that implements this trait and adding one
// `.register(...)` call; nothing is discovered by name at runtime.

use super::config::ExtractorConfig;
use super::normalizer::Domain;

/// A pure, deterministic heuristic over a parsed domain.
pub trait FeatureExtractor: Send + Sync {
    /// Identifier used in registry errors and logs.
    fn name(&self) -> &'static str;

    /// Feature names this extractor emits, in the order `extract` writes them.
    ///
    /// Depends only on the configuration, never on the domain, so the
    /// registry can freeze the column layout once at construction.
    fn feature_names(&self, config: &ExtractorConfig) -> Vec<String>;

    /// Append exactly one value per declared feature name to `out`.
    fn extract(&self, domain: &Domain, config: &ExtractorConfig, out: &mut Vec<f64>);
}
