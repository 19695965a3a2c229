// Output — the per-host event, terminal rendering, and per-tier log files.

pub mod terminal;
pub mod tier_log;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::{CertContext, ScoreResult};

/// Emitted once for every host that clears a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub host: String,
    /// Rounded to 4 decimal places.
    pub score: f64,
    pub tier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<EventContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seen_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_ca: Option<String>,
}

impl EventContext {
    fn is_empty(&self) -> bool {
        self.seen_timestamp.is_none()
            && self.log_source.is_none()
            && self.issuer_ca.is_none()
            && self.root_ca.is_none()
    }
}

/// Which certificate fields are copied into events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextFields {
    pub seen: bool,
    pub source: bool,
    pub issuer: bool,
    pub root: bool,
}

impl ContextFields {
    pub fn all() -> Self {
        Self {
            seen: true,
            source: true,
            issuer: true,
            root: true,
        }
    }

    /// Parse a comma list such as `"seen,issuer"`. Empty means none.
    pub fn parse(list: &str) -> anyhow::Result<Self> {
        let mut fields = Self::default();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.to_lowercase().as_str() {
                "seen" => fields.seen = true,
                "source" => fields.source = true,
                "issuer" => fields.issuer = true,
                "root" => fields.root = true,
                "all" => fields = Self::all(),
                other => anyhow::bail!(
                    "Unknown context field '{other}' (expected seen, source, issuer, root)"
                ),
            }
        }
        Ok(fields)
    }

    pub fn any(&self) -> bool {
        self.seen || self.source || self.issuer || self.root
    }
}

pub fn round4(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

fn format_seen(seen: f64) -> Option<String> {
    let secs = seen.trunc() as i64;
    let nanos = ((seen.fract() * 1e9).round() as u32).min(999_999_999);
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl ScoreEvent {
    pub fn from_result(result: &ScoreResult, fields: ContextFields) -> Self {
        Self {
            host: result.host.clone(),
            score: round4(result.score),
            tier: result.tier.name.clone(),
            context: event_context(&result.context, fields),
        }
    }
}

fn event_context(cert: &CertContext, fields: ContextFields) -> Option<EventContext> {
    let context = EventContext {
        seen_timestamp: cert.seen.filter(|_| fields.seen).and_then(format_seen),
        log_source: cert.source.clone().filter(|_| fields.source),
        issuer_ca: cert.issuer_ca.clone().filter(|_| fields.issuer),
        root_ca: cert.root_ca.clone().filter(|_| fields.root),
    };
    (!context.is_empty()).then_some(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Tier;

    fn result() -> ScoreResult {
        ScoreResult {
            batch: 1,
            host: "paypal-login.tk".into(),
            score: 0.953_471,
            tier: Tier::new("high", 0.9, "red"),
            context: CertContext {
                seen: Some(1_700_000_000.0),
                source: Some("Argon".into()),
                issuer_ca: Some("Let's Encrypt".into()),
                root_ca: None,
            },
        }
    }

    #[test]
    fn test_score_rounded_to_four_places() {
        let event = ScoreEvent::from_result(&result(), ContextFields::default());
        assert_eq!(event.score, 0.9535);
        assert_eq!(event.tier, "high");
    }

    #[test]
    fn test_context_omitted_when_disabled() {
        let event = ScoreEvent::from_result(&result(), ContextFields::default());
        assert!(event.context.is_none());
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("context"), "{json}");
    }

    #[test]
    fn test_context_only_enabled_fields() {
        let fields = ContextFields::parse("seen, issuer").unwrap();
        let context = ScoreEvent::from_result(&result(), fields).context.unwrap();
        assert_eq!(context.seen_timestamp.as_deref(), Some("2023-11-14T22:13:20Z"));
        assert_eq!(context.issuer_ca.as_deref(), Some("Let's Encrypt"));
        assert!(context.log_source.is_none());
    }

    #[test]
    fn test_context_fields_parse_rejects_unknown() {
        assert!(ContextFields::parse("seen,bogus").is_err());
        assert!(!ContextFields::parse("").unwrap().any());
    }
}
