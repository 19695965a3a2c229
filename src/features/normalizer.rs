// Domain normalizer — turns a raw certificate hostname into the parsed
// sample every extractor sees.
//
// Three views of one host travel together:
//   - the normalized FQDN (generic service prefixes like www/mail removed),
//   - the public-suffix-aware split into subdomain / domain label / suffix,
//   - the token list (runs of alphanumerics).
//
// Suffix splitting goes through the `psl` crate, which compiles the public
// suffix list into the binary. No network fetch, no cache file, so the same
// host always splits the same way on every machine.

use std::collections::HashSet;

use anyhow::{Context, Result};

/// Hosts that carry no phishing signal when they lead an FQDN.
pub const DEFAULT_COMMON_HOSTS: [&str; 7] = [
    "*",
    "www",
    "mail",
    "cpanel",
    "webmail",
    "webdisk",
    "autodiscover",
];

/// Longest hostname DNS allows (without the trailing root dot).
const MAX_HOSTNAME_LEN: usize = 253;

/// Public-suffix split of a hostname.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainParts {
    /// Everything left of the registrable domain ("" when there is none).
    pub subdomain: String,
    /// The registrable label without its suffix, e.g. "google" for "www.google.co.uk".
    pub domain: String,
    /// The public suffix, e.g. "co.uk".
    pub suffix: String,
}

/// A parsed hostname. Built once per host, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    /// Trimmed, lowercased input.
    pub host: String,
    /// `host` with leading benign service labels removed.
    pub normalized: String,
    pub parts: DomainParts,
    pub tokens: Vec<String>,
}

/// Strips benign host prefixes and splits hostnames into their parts.
#[derive(Debug, Clone)]
pub struct DomainNormalizer {
    common_hosts: HashSet<String>,
}

impl Default for DomainNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_COMMON_HOSTS)
    }
}

impl DomainNormalizer {
    pub fn new<I, S>(common_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            common_hosts: common_hosts
                .into_iter()
                .map(|h| h.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Remove leading benign labels ("www.", "mail.", "*." ...).
    ///
    /// Labels are stripped for as long as the left-most one is in the benign
    /// set and at least one more label follows, so the result is a fixed
    /// point: `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize<'a>(&self, fqdn: &'a str) -> &'a str {
        let mut current = fqdn;
        while let Some((first, rest)) = current.split_once('.') {
            if !self.common_hosts.contains(first) {
                break;
            }
            current = rest;
        }
        current
    }

    /// Split a hostname into subdomain, registrable label, and public suffix.
    pub fn parse(fqdn: &str) -> Result<DomainParts> {
        let host = fqdn.strip_suffix('.').unwrap_or(fqdn);
        let suffix = psl::suffix_str(host)
            .with_context(|| format!("No public suffix found in '{fqdn}'"))?;

        let (subdomain, domain) = match psl::domain_str(host) {
            Some(registrable) => {
                let label = registrable
                    .strip_suffix(suffix)
                    .and_then(|d| d.strip_suffix('.'))
                    .unwrap_or("");
                let subdomain = host
                    .strip_suffix(registrable)
                    .and_then(|s| s.strip_suffix('.'))
                    .unwrap_or("");
                (subdomain, label)
            }
            // The whole host is a public suffix (e.g. "co.uk")
            None => (
                host.strip_suffix(suffix)
                    .and_then(|s| s.strip_suffix('.'))
                    .unwrap_or(""),
                "",
            ),
        };

        Ok(DomainParts {
            subdomain: subdomain.to_string(),
            domain: domain.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Split on runs of non-alphanumeric characters, dropping empty tokens.
    pub fn tokenize(fqdn: &str) -> Vec<String> {
        fqdn.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Validate a raw hostname and build the full parsed sample.
    ///
    /// Fails on input that cannot be a hostname (empty, whitespace or control
    /// characters, empty labels, overlong). Callers on the scoring path turn
    /// the failure into a neutral score for that host only.
    pub fn prepare(&self, raw: &str) -> Result<Domain> {
        let trimmed = raw.trim();
        let host = trimmed.strip_suffix('.').unwrap_or(trimmed).to_lowercase();

        if host.is_empty() {
            anyhow::bail!("Empty hostname");
        }
        if host.len() > MAX_HOSTNAME_LEN {
            anyhow::bail!(
                "Hostname is {} bytes, longer than the {MAX_HOSTNAME_LEN} DNS allows",
                host.len()
            );
        }
        if host.chars().any(|c| c.is_whitespace() || c.is_control()) {
            anyhow::bail!("Hostname '{}' contains whitespace or control characters", host.escape_debug());
        }
        if host.split('.').any(str::is_empty) {
            anyhow::bail!("Hostname '{host}' contains an empty label");
        }

        let parts = Self::parse(&host)?;
        let normalized = self.normalize(&host).to_string();
        let tokens = Self::tokenize(&host);

        Ok(Domain {
            host,
            normalized,
            parts,
            tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_domain() {
        let parts = DomainNormalizer::parse("www.google.com").unwrap();
        assert_eq!(parts.subdomain, "www");
        assert_eq!(parts.domain, "google");
        assert_eq!(parts.suffix, "com");
    }

    #[test]
    fn test_parse_multi_label_suffix() {
        let parts = DomainNormalizer::parse("login.secure.example.co.uk").unwrap();
        assert_eq!(parts.subdomain, "login.secure");
        assert_eq!(parts.domain, "example");
        assert_eq!(parts.suffix, "co.uk");
    }

    #[test]
    fn test_parse_bare_suffix_has_no_label() {
        let parts = DomainNormalizer::parse("co.uk").unwrap();
        assert_eq!(parts.subdomain, "");
        assert_eq!(parts.domain, "");
        assert_eq!(parts.suffix, "co.uk");
    }

    #[test]
    fn test_normalize_strips_each_common_host() {
        let normalizer = DomainNormalizer::default();
        for prefix in DEFAULT_COMMON_HOSTS {
            let raw = format!("{prefix}.google.com");
            assert_eq!(normalizer.normalize(&raw), "google.com", "prefix {prefix}");
        }
    }

    #[test]
    fn test_normalize_leaves_lookalike_prefix() {
        let normalizer = DomainNormalizer::default();
        assert_eq!(normalizer.normalize("wvw.google.com"), "wvw.google.com");
    }

    #[test]
    fn test_normalize_keeps_single_label() {
        let normalizer = DomainNormalizer::default();
        assert_eq!(normalizer.normalize("www"), "www");
        assert_eq!(normalizer.normalize("mail.www"), "www");
    }

    #[test]
    fn test_tokenize_discards_empty_tokens() {
        assert_eq!(
            DomainNormalizer::tokenize("*.pay--pal.com"),
            vec!["pay", "pal", "com"]
        );
    }

    #[test]
    fn test_prepare_lowercases_and_strips_root_dot() {
        let normalizer = DomainNormalizer::default();
        let domain = normalizer.prepare("  WWW.Example.COM. ").unwrap();
        assert_eq!(domain.host, "www.example.com");
        assert_eq!(domain.normalized, "example.com");
        assert_eq!(domain.parts.domain, "example");
    }

    #[test]
    fn test_prepare_rejects_malformed_hosts() {
        let normalizer = DomainNormalizer::default();
        assert!(normalizer.prepare("").is_err());
        assert!(normalizer.prepare("   ").is_err());
        assert!(normalizer.prepare("bad host.com").is_err());
        assert!(normalizer.prepare("a..com").is_err());
        assert!(normalizer.prepare(&"a".repeat(300)).is_err());
    }
}
