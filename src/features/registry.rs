// Feature registry — the explicit, ordered list of extractors.
//
// Construction is where all the shape decisions happen: every extractor
// declares its feature names for the given configuration, the registry
// rejects duplicates, and the sorted column order is frozen. Extraction
// afterwards only writes numbers and permutes them into that order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;

use super::config::ExtractorConfig;
use super::extractors::{
    BrandPresence, DashCount, DomainEntropy, KeywordMatch, NearMissSimilarity, PeriodCount,
    TldMembership, TokenKeywordMatch,
};
use super::normalizer::Domain;
use super::traits::FeatureExtractor;

/// Collects extractors before the registry is validated and frozen.
pub struct RegistryBuilder {
    config: ExtractorConfig,
    extractors: Vec<Box<dyn FeatureExtractor>>,
}

impl RegistryBuilder {
    /// Add an extractor. Registration order does not affect column order.
    pub fn register<E: FeatureExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    /// Validate feature names and freeze the column layout.
    ///
    /// Fails if two extractors (or one extractor twice, e.g. from a repeated
    /// list entry) emit the same feature name.
    pub fn build(self) -> Result<FeatureRegistry> {
        let mut owners: HashMap<String, &'static str> = HashMap::new();
        let mut declared = Vec::new();
        let mut widths = Vec::with_capacity(self.extractors.len());

        for extractor in &self.extractors {
            let names = extractor.feature_names(&self.config);
            widths.push(names.len());
            for name in names {
                if let Some(previous) = owners.insert(name.clone(), extractor.name()) {
                    anyhow::bail!(
                        "Feature name collision: '{name}' is emitted by both '{previous}' and '{}'",
                        extractor.name()
                    );
                }
                declared.push(name);
            }
        }

        // order[i] = declared position of the i-th column in sorted order
        let mut order: Vec<usize> = (0..declared.len()).collect();
        order.sort_by(|&a, &b| declared[a].cmp(&declared[b]));
        let names = order.iter().map(|&i| declared[i].clone()).collect();

        Ok(FeatureRegistry {
            config: Arc::new(self.config),
            extractors: self.extractors,
            widths,
            names,
            order,
        })
    }
}

/// Validated set of extractors with a frozen, name-sorted column order.
pub struct FeatureRegistry {
    config: Arc<ExtractorConfig>,
    extractors: Vec<Box<dyn FeatureExtractor>>,
    /// Declared feature count per extractor, same order as `extractors`.
    widths: Vec<usize>,
    names: Vec<String>,
    order: Vec<usize>,
}

impl FeatureRegistry {
    pub fn builder(config: ExtractorConfig) -> RegistryBuilder {
        RegistryBuilder {
            config,
            extractors: Vec::new(),
        }
    }

    /// Registry with every built-in extractor.
    pub fn with_default_extractors(config: ExtractorConfig) -> Result<Self> {
        Self::builder(config)
            .register(TldMembership)
            .register(BrandPresence)
            .register(KeywordMatch)
            .register(TokenKeywordMatch)
            .register(DomainEntropy)
            .register(NearMissSimilarity)
            .register(DashCount)
            .register(PeriodCount)
            .build()
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Column names in vector order (lexicographic).
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns in every vector this registry produces.
    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Run every extractor and return the values in column order.
    ///
    /// `scratch` is reused across calls to avoid a per-host allocation for
    /// the unsorted values.
    pub fn extract_row(&self, domain: &Domain, scratch: &mut Vec<f64>) -> Result<Vec<f64>> {
        scratch.clear();
        for (extractor, &expected) in self.extractors.iter().zip(&self.widths) {
            let before = scratch.len();
            extractor.extract(domain, &self.config, scratch);
            if scratch.len() - before != expected {
                anyhow::bail!(
                    "Extractor '{}' wrote {} values but declares {expected} features",
                    extractor.name(),
                    scratch.len() - before
                );
            }
        }
        Ok(self.order.iter().map(|&i| scratch[i]).collect())
    }

    /// Run every extractor and return the merged name → value mapping.
    pub fn extract_named(&self, domain: &Domain) -> Result<BTreeMap<String, f64>> {
        let mut scratch = Vec::with_capacity(self.width());
        let row = self.extract_row(domain, &mut scratch)?;
        Ok(self.names.iter().cloned().zip(row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::normalizer::DomainNormalizer;

    struct Constant(&'static str, &'static str);

    impl FeatureExtractor for Constant {
        fn name(&self) -> &'static str {
            self.0
        }
        fn feature_names(&self, _config: &ExtractorConfig) -> Vec<String> {
            vec![self.1.to_string()]
        }
        fn extract(&self, _domain: &Domain, _config: &ExtractorConfig, out: &mut Vec<f64>) {
            out.push(1.0);
        }
    }

    struct Liar;

    impl FeatureExtractor for Liar {
        fn name(&self) -> &'static str {
            "liar"
        }
        fn feature_names(&self, _config: &ExtractorConfig) -> Vec<String> {
            vec!["a".to_string(), "b".to_string()]
        }
        fn extract(&self, _domain: &Domain, _config: &ExtractorConfig, out: &mut Vec<f64>) {
            out.push(1.0);
        }
    }

    #[test]
    fn test_collision_between_extractors_fails_construction() {
        let result = FeatureRegistry::builder(ExtractorConfig::default())
            .register(Constant("first", "shared"))
            .register(Constant("second", "shared"))
            .build();
        let err = result.err().expect("collision must fail").to_string();
        assert!(err.contains("shared"), "{err}");
        assert!(err.contains("first") && err.contains("second"), "{err}");
    }

    #[test]
    fn test_repeated_list_entry_is_a_collision() {
        let config = ExtractorConfig {
            keywords: vec!["login".into(), "login".into()],
            ..Default::default()
        };
        assert!(FeatureRegistry::with_default_extractors(config).is_err());
    }

    #[test]
    fn test_columns_sorted_regardless_of_registration_order() {
        let registry = FeatureRegistry::builder(ExtractorConfig::default())
            .register(Constant("z", "zeta"))
            .register(Constant("a", "alpha"))
            .register(Constant("m", "mu"))
            .build()
            .unwrap();
        assert_eq!(registry.feature_names(), ["alpha", "mu", "zeta"]);
    }

    #[test]
    fn test_extractor_writing_wrong_count_is_an_error() {
        let registry = FeatureRegistry::builder(ExtractorConfig::default())
            .register(Liar)
            .build()
            .unwrap();
        let domain = DomainNormalizer::default().prepare("example.com").unwrap();
        let mut scratch = Vec::new();
        assert!(registry.extract_row(&domain, &mut scratch).is_err());
    }
}
