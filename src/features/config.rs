// Extractor configuration — the word lists every extractor reads.
//
// The lists are loaded once (from a data directory of plain text files) and
// then frozen: the registry holds the config behind an Arc and never hands
// out a mutable reference. The same config is serialized into every trained
// model so inference rebuilds exactly the vector shape training used.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::normalizer::DEFAULT_COMMON_HOSTS;

/// Subdirectory names under the data root, one list per directory.
pub const COMMON_HOSTS_DIR: &str = "common_hosts";
pub const TLDS_DIR: &str = "tlds";
pub const BRANDS_DIR: &str = "targeted_brands";
pub const KEYWORDS_DIR: &str = "keywords";
pub const FQDN_KEYWORDS_DIR: &str = "fqdn_keywords";
pub const SIMILARITY_WORDS_DIR: &str = "similarity_words";

/// Immutable lists consumed by the feature extractors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Leading labels removed during normalization.
    pub common_hosts: Vec<String>,
    /// Suffixes that get a one-hot indicator.
    pub tlds: Vec<String>,
    /// Brands commonly impersonated by phishing sites.
    pub brands: Vec<String>,
    /// Substrings searched for anywhere in the normalized FQDN.
    pub keywords: Vec<String>,
    /// Words that must match a token exactly.
    pub fqdn_keywords: Vec<String>,
    /// Words whose single-character typos are flagged.
    pub similarity_words: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            common_hosts: DEFAULT_COMMON_HOSTS.iter().map(|h| h.to_string()).collect(),
            tlds: Vec::new(),
            brands: Vec::new(),
            keywords: Vec::new(),
            fqdn_keywords: Vec::new(),
            similarity_words: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    /// Load every list from its subdirectory of `data_dir`.
    ///
    /// `common_hosts/` is optional and falls back to the built-in list; the
    /// other directories must exist.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let common_hosts_dir = data_dir.join(COMMON_HOSTS_DIR);
        let common_hosts = if common_hosts_dir.is_dir() {
            load_from_directory(&common_hosts_dir)?
        } else {
            DEFAULT_COMMON_HOSTS.iter().map(|h| h.to_string()).collect()
        };

        let config = Self {
            common_hosts,
            tlds: load_from_directory(&data_dir.join(TLDS_DIR))?,
            brands: load_from_directory(&data_dir.join(BRANDS_DIR))?,
            keywords: load_from_directory(&data_dir.join(KEYWORDS_DIR))?,
            fqdn_keywords: load_from_directory(&data_dir.join(FQDN_KEYWORDS_DIR))?,
            similarity_words: load_from_directory(&data_dir.join(SIMILARITY_WORDS_DIR))?,
        };

        info!(
            tlds = config.tlds.len(),
            brands = config.brands.len(),
            keywords = config.keywords.len(),
            fqdn_keywords = config.fqdn_keywords.len(),
            similarity_words = config.similarity_words.len(),
            "Loaded extractor configuration"
        );

        Ok(config)
    }

    /// SHA-256 over the canonical JSON form, hex encoded.
    ///
    /// Stored next to a trained model; a mismatch on reload means the lists
    /// were edited after training.
    pub fn fingerprint(&self) -> String {
        // Struct fields serialize in declaration order, so the JSON is canonical.
        let json = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&json))
    }
}

/// Read every non-hidden text file under `path` (recursively), one entry per line.
///
/// Files are visited in sorted name order so the resulting list, and with it
/// the feature order, does not depend on filesystem iteration order. Entries
/// are trimmed, blank lines dropped, and repeats collapsed to the first
/// occurrence.
pub fn load_from_directory(path: &Path) -> Result<Vec<String>> {
    if !path.is_dir() {
        anyhow::bail!("List directory not found: {}", path.display());
    }

    let files = collect_files(path)?;

    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for file in &files {
        let contents = fs::read_to_string(file)
            .with_context(|| format!("Failed to read list file {}", file.display()))?;
        for line in contents.lines() {
            let entry = line.trim();
            if !entry.is_empty() && seen.insert(entry.to_string()) {
                values.push(entry.to_string());
            }
        }
    }

    debug!(dir = %path.display(), files = files.len(), entries = values.len(), "Loaded list");
    Ok(values)
}

fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
