// Reporting tiers — which probabilities are worth shouting about.
//
// A tier matches when the score is strictly greater than its threshold.
// Tiers are kept sorted by descending threshold so the first match is the
// most severe one; a score that clears no tier is simply not reported.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A named score band with its display attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub threshold: f64,
    /// Text shown in terminal output. Defaults to the uppercased name.
    #[serde(default)]
    pub label: String,
    /// Any colour name the `colored` crate understands.
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "white".to_string()
}

impl Tier {
    pub fn new(name: &str, threshold: f64, color: &str) -> Self {
        Self {
            name: name.to_string(),
            threshold,
            label: name.to_uppercase(),
            color: color.to_string(),
        }
    }
}

/// Validated tiers, most severe first.
#[derive(Debug, Clone, PartialEq)]
pub struct TierSet {
    tiers: Vec<Tier>,
}

impl Default for TierSet {
    fn default() -> Self {
        Self {
            tiers: vec![
                Tier::new("high", 0.9, "red"),
                Tier::new("suspicious", 0.75, "yellow"),
                Tier::new("low", 0.6, "cyan"),
            ],
        }
    }
}

impl TierSet {
    /// Validate and sort. Thresholds must lie in [0, 1] and names be unique.
    ///
    /// Names also become log file names, so path separators and a leading
    /// dot are rejected.
    pub fn new(mut tiers: Vec<Tier>) -> Result<Self> {
        let mut names = HashSet::new();
        for tier in &mut tiers {
            if !(0.0..=1.0).contains(&tier.threshold) {
                anyhow::bail!(
                    "Tier '{}' threshold {} is outside [0, 1]",
                    tier.name,
                    tier.threshold
                );
            }
            if tier.name.trim().is_empty() {
                anyhow::bail!("Tier names must not be empty");
            }
            if tier.name.starts_with('.') || tier.name.contains(['/', '\\']) {
                anyhow::bail!(
                    "Tier name '{}' must not contain path separators or start with '.'",
                    tier.name
                );
            }
            if !names.insert(tier.name.clone()) {
                anyhow::bail!("Duplicate tier name '{}'", tier.name);
            }
            if tier.label.is_empty() {
                tier.label = tier.name.to_uppercase();
            }
        }
        // Stable sort: equal thresholds keep their configured order.
        tiers.sort_by(|a, b| b.threshold.total_cmp(&a.threshold));
        Ok(Self { tiers })
    }

    /// Parse a JSON list of tiers.
    pub fn from_json(json: &str) -> Result<Self> {
        let tiers: Vec<Tier> = serde_json::from_str(json).context("Invalid tier JSON")?;
        Self::new(tiers)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tier file {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Most severe tier whose threshold the score exceeds.
    pub fn evaluate(&self, score: f64) -> Option<&Tier> {
        evaluate(score, &self.tiers)
    }
}

/// First tier in `tiers` whose threshold is strictly below `score`.
///
/// `tiers` is assumed sorted by descending threshold. NaN matches nothing.
pub fn evaluate(score: f64, tiers: &[Tier]) -> Option<&Tier> {
    tiers.iter().find(|tier| score > tier.threshold)
}
