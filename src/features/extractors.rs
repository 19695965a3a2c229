// Built-in feature extractors.
//
// Feature names follow a fixed scheme so trained models stay readable:
//   tld_<suffix>                 one-hot suffix membership
//   <brand>_brand_subdomain      brand appears in the subdomain
//   <brand>_brand_domain         brand appears in the registrable label
//   <keyword>_kw                 keyword is a substring of the normalized FQDN
//   <keyword>_kw_fqdn_words      keyword equals one of the tokens
//   entropy                      Shannon entropy of the registrable label
//   <word>_lev_1                 a token is exactly one edit away from the word
//   num_dashes / num_periods     punctuation counts of the normalized FQDN

use std::collections::BTreeMap;

use super::config::ExtractorConfig;
use super::normalizer::Domain;
use super::traits::FeatureExtractor;

/// Punycode marker; IDN hosts contain dashes that carry no signal.
const PUNYCODE_PREFIX: &str = "xn--";

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// One binary column per configured suffix.
pub struct TldMembership;

impl FeatureExtractor for TldMembership {
    fn name(&self) -> &'static str {
        "tld_membership"
    }

    fn feature_names(&self, config: &ExtractorConfig) -> Vec<String> {
        config.tlds.iter().map(|tld| format!("tld_{tld}")).collect()
    }

    fn extract(&self, domain: &Domain, config: &ExtractorConfig, out: &mut Vec<f64>) {
        out.extend(
            config
                .tlds
                .iter()
                .map(|tld| indicator(*tld == domain.parts.suffix)),
        );
    }
}

/// Brand substrings in the subdomain (likely phishing) vs. the registrable
/// label (likely the brand itself).
pub struct BrandPresence;

impl FeatureExtractor for BrandPresence {
    fn name(&self) -> &'static str {
        "brand_presence"
    }

    fn feature_names(&self, config: &ExtractorConfig) -> Vec<String> {
        config
            .brands
            .iter()
            .flat_map(|brand| {
                [
                    format!("{brand}_brand_subdomain"),
                    format!("{brand}_brand_domain"),
                ]
            })
            .collect()
    }

    fn extract(&self, domain: &Domain, config: &ExtractorConfig, out: &mut Vec<f64>) {
        for brand in &config.brands {
            out.push(indicator(domain.parts.subdomain.contains(brand.as_str())));
            out.push(indicator(domain.parts.domain.contains(brand.as_str())));
        }
    }
}

/// Keywords anywhere in the normalized FQDN ("account" matches "dswaccounting.tk").
pub struct KeywordMatch;

impl FeatureExtractor for KeywordMatch {
    fn name(&self) -> &'static str {
        "keyword_match"
    }

    fn feature_names(&self, config: &ExtractorConfig) -> Vec<String> {
        config.keywords.iter().map(|kw| format!("{kw}_kw")).collect()
    }

    fn extract(&self, domain: &Domain, config: &ExtractorConfig, out: &mut Vec<f64>) {
        out.extend(
            config
                .keywords
                .iter()
                .map(|kw| indicator(domain.normalized.contains(kw.as_str()))),
        );
    }
}

/// Keywords that must equal a whole token.
pub struct TokenKeywordMatch;

impl FeatureExtractor for TokenKeywordMatch {
    fn name(&self) -> &'static str {
        "token_keyword_match"
    }

    fn feature_names(&self, config: &ExtractorConfig) -> Vec<String> {
        config
            .fqdn_keywords
            .iter()
            .map(|kw| format!("{kw}_kw_fqdn_words"))
            .collect()
    }

    fn extract(&self, domain: &Domain, config: &ExtractorConfig, out: &mut Vec<f64>) {
        out.extend(
            config
                .fqdn_keywords
                .iter()
                .map(|kw| indicator(domain.tokens.iter().any(|t| t == kw))),
        );
    }
}

/// Character randomness of the registrable label.
pub struct DomainEntropy;

impl FeatureExtractor for DomainEntropy {
    fn name(&self) -> &'static str {
        "domain_entropy"
    }

    fn feature_names(&self, _config: &ExtractorConfig) -> Vec<String> {
        vec!["entropy".to_string()]
    }

    fn extract(&self, domain: &Domain, _config: &ExtractorConfig, out: &mut Vec<f64>) {
        out.push(shannon_entropy(&domain.parts.domain));
    }
}

/// Single-character typos of commonly spoofed words ("pavpal" for "paypal").
pub struct NearMissSimilarity;

impl FeatureExtractor for NearMissSimilarity {
    fn name(&self) -> &'static str {
        "near_miss_similarity"
    }

    fn feature_names(&self, config: &ExtractorConfig) -> Vec<String> {
        config
            .similarity_words
            .iter()
            .map(|word| format!("{word}_lev_1"))
            .collect()
    }

    fn extract(&self, domain: &Domain, config: &ExtractorConfig, out: &mut Vec<f64>) {
        out.extend(
            config
                .similarity_words
                .iter()
                .map(|word| indicator(has_near_miss(&domain.tokens, word))),
        );
    }
}

/// Dashes in the normalized FQDN; zero for punycode hosts.
pub struct DashCount;

impl FeatureExtractor for DashCount {
    fn name(&self) -> &'static str {
        "dash_count"
    }

    fn feature_names(&self, _config: &ExtractorConfig) -> Vec<String> {
        vec!["num_dashes".to_string()]
    }

    fn extract(&self, domain: &Domain, _config: &ExtractorConfig, out: &mut Vec<f64>) {
        out.push(dash_count(&domain.normalized) as f64);
    }
}

/// Periods in the normalized FQDN (deep subdomain nesting).
pub struct PeriodCount;

impl FeatureExtractor for PeriodCount {
    fn name(&self) -> &'static str {
        "period_count"
    }

    fn feature_names(&self, _config: &ExtractorConfig) -> Vec<String> {
        vec!["num_periods".to_string()]
    }

    fn extract(&self, domain: &Domain, _config: &ExtractorConfig, out: &mut Vec<f64>) {
        out.push(domain.normalized.matches('.').count() as f64);
    }
}

/// Shannon entropy (base 2) of the character distribution of `label`.
///
/// Returns 0.0 for an empty label.
pub fn shannon_entropy(label: &str) -> f64 {
    // BTreeMap keeps the summation order fixed, so the result is bit-identical
    // across runs.
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for c in label.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let len = total as f64;
    let entropy: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            p * p.log2()
        })
        .sum();
    // -0.0 for a single repeated character
    (-entropy).max(0.0)
}

/// True when some token is exactly one edit (Levenshtein) away from `word`.
pub fn has_near_miss(tokens: &[String], word: &str) -> bool {
    tokens.iter().any(|token| strsim::levenshtein(token, word) == 1)
}

/// Literal dash count, except punycode hosts report zero.
pub fn dash_count(fqdn: &str) -> usize {
    if fqdn.contains(PUNYCODE_PREFIX) {
        0
    } else {
        fqdn.matches('-').count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_of_repeated_character_is_zero() {
        assert_eq!(shannon_entropy("aaaa"), 0.0);
    }

    #[test]
    fn test_entropy_of_distinct_characters_is_log2_n() {
        assert_eq!(shannon_entropy("1234"), 2.0);
        assert!((shannon_entropy("abcdefgh") - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_entropy_of_empty_label_is_zero() {
        assert_eq!(shannon_entropy(""), 0.0);
    }

    #[test]
    fn test_near_miss_requires_distance_exactly_one() {
        let tokens = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        assert!(has_near_miss(&tokens(&["com", "pavpal", "signin"]), "paypal"));
        assert!(!has_near_miss(&tokens(&["www", "paypal", "notmalware"]), "paypal"));
        assert!(!has_near_miss(&tokens(&["www", "payyyypal"]), "paypal"));
    }

    #[test]
    fn test_dash_count_ignores_punycode() {
        assert_eq!(dash_count("xn--pypal-4ve.com"), 0);
        assert_eq!(dash_count("xn--a-b-c.com"), 0);
        assert_eq!(dash_count("appleid.com-suspicious.1234.com"), 1);
        assert_eq!(dash_count("a-b-c.com"), 2);
    }
}
