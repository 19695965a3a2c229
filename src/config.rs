use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::features::ExtractorConfig;
use crate::output::ContextFields;
use crate::pipeline::PipelineConfig;
use crate::scoring::TierSet;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Every
/// variable has a default, so `init` and `status` work with no setup.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    /// Root of the list directories (targeted_brands/, keywords/, benign/ ...).
    pub data_dir: PathBuf,
    /// Overrides the active model stored in the database.
    pub model_override: Option<String>,
    /// JSON tier file; the built-in tiers are used when unset.
    pub tiers_path: Option<PathBuf>,
    /// When set, flagged hosts are appended to `<dir>/<tier>_v<version>.log`.
    pub log_dir: Option<PathBuf>,
    pub context_fields: ContextFields,
    pub color: bool,
    pub pipeline: PipelineConfig,
}

fn default_db_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("phishstream").join("phishstream.db"))
        .unwrap_or_else(|| PathBuf::from("./phishstream.db"))
        .to_string_lossy()
        .into_owned()
}

fn parse_count(name: &str, value: Option<String>, default: usize, max: usize) -> Result<usize> {
    match value {
        None => Ok(default),
        Some(v) => {
            let n: usize = v
                .trim()
                .parse()
                .with_context(|| format!("{name} must be a positive integer, got '{v}'"))?;
            if n == 0 {
                anyhow::bail!("{name} must be at least 1");
            }
            if n > max {
                anyhow::bail!("{name} must be at most {max}, got {n}");
            }
            Ok(n)
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from any variable source (the environment, or a map in tests).
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let context_fields = match non_empty("PHISHSTREAM_CONTEXT") {
            Some(list) => ContextFields::parse(&list)?,
            None => ContextFields::default(),
        };

        let pipeline = PipelineConfig {
            queue_depth: parse_count(
                "PHISHSTREAM_QUEUE_DEPTH",
                non_empty("PHISHSTREAM_QUEUE_DEPTH"),
                crate::pipeline::stream::DEFAULT_QUEUE_DEPTH,
                crate::pipeline::stream::MAX_QUEUE_DEPTH,
            )?,
            workers: parse_count(
                "PHISHSTREAM_WORKERS",
                non_empty("PHISHSTREAM_WORKERS"),
                crate::pipeline::stream::DEFAULT_WORKERS,
                crate::pipeline::stream::MAX_WORKERS,
            )?,
        };

        Ok(Self {
            db_path: non_empty("PHISHSTREAM_DB_PATH").unwrap_or_else(default_db_path),
            data_dir: non_empty("PHISHSTREAM_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            model_override: non_empty("PHISHSTREAM_MODEL"),
            tiers_path: non_empty("PHISHSTREAM_TIERS").map(PathBuf::from),
            log_dir: non_empty("PHISHSTREAM_LOG_DIR").map(PathBuf::from),
            context_fields,
            color: non_empty("PHISHSTREAM_COLOR").as_deref() != Some("0"),
            pipeline,
        })
    }

    /// Tier list from PHISHSTREAM_TIERS, or the defaults.
    pub fn tiers(&self) -> Result<TierSet> {
        match &self.tiers_path {
            Some(path) => TierSet::load(path),
            None => Ok(TierSet::default()),
        }
    }

    /// Check that the data directory exists before training.
    pub fn require_data_dir(&self) -> Result<()> {
        if !self.data_dir.is_dir() {
            anyhow::bail!(
                "Data directory {} not found.\n\
                 Set PHISHSTREAM_DATA_DIR to the folder holding targeted_brands/, keywords/, \
                 fqdn_keywords/, similarity_words/, tlds/, benign/ and malicious/.",
                self.data_dir.display()
            );
        }
        Ok(())
    }

    /// Load the extractor lists from the data directory.
    pub fn extractor_config(&self) -> Result<ExtractorConfig> {
        self.require_data_dir()?;
        ExtractorConfig::load(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert!(config.color);
        assert!(config.model_override.is_none());
        assert!(!config.context_fields.any());
        assert!(config.db_path.ends_with("phishstream.db"));
    }

    #[test]
    fn test_overrides() {
        let config = from(&[
            ("PHISHSTREAM_DB_PATH", "/tmp/x.db"),
            ("PHISHSTREAM_MODEL", "v2"),
            ("PHISHSTREAM_CONTEXT", "seen,root"),
            ("PHISHSTREAM_COLOR", "0"),
            ("PHISHSTREAM_QUEUE_DEPTH", "8"),
            ("PHISHSTREAM_WORKERS", "2"),
        ])
        .unwrap();
        assert_eq!(config.db_path, "/tmp/x.db");
        assert_eq!(config.model_override.as_deref(), Some("v2"));
        assert!(config.context_fields.seen && config.context_fields.root);
        assert!(!config.context_fields.issuer);
        assert!(!config.color);
        assert_eq!(config.pipeline.queue_depth, 8);
        assert_eq!(config.pipeline.workers, 2);
    }

    #[test]
    fn test_invalid_counts_rejected() {
        assert!(from(&[("PHISHSTREAM_WORKERS", "0")]).is_err());
        assert!(from(&[("PHISHSTREAM_QUEUE_DEPTH", "lots")]).is_err());
    }

    #[test]
    fn test_oversized_counts_rejected() {
        let huge = usize::MAX.to_string();
        assert!(from(&[("PHISHSTREAM_QUEUE_DEPTH", huge.as_str())]).is_err());
        assert!(from(&[("PHISHSTREAM_QUEUE_DEPTH", "65537")]).is_err());
        assert!(from(&[("PHISHSTREAM_WORKERS", "100000")]).is_err());
        let config = from(&[("PHISHSTREAM_QUEUE_DEPTH", "65536")]).unwrap();
        assert_eq!(config.pipeline.queue_depth, 65_536);
    }
}
