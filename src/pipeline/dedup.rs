// Wildcard de-duplication within one certificate batch.
//
// A certificate for "*.example.com" usually also lists "example.com". Scoring
// both would report the same site twice, so the literal entry is dropped and
// the wildcard kept.

use std::collections::HashSet;

/// Remove every entry that is also covered by a `*.` entry in the same batch.
///
/// Order of the remaining hosts is preserved.
pub fn dedup_wildcards<S: AsRef<str>>(batch: &[S]) -> Vec<String> {
    let covered: HashSet<&str> = batch
        .iter()
        .filter_map(|host| host.as_ref().strip_prefix("*."))
        .collect();

    batch
        .iter()
        .map(AsRef::as_ref)
        .filter(|host| !covered.contains(host))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_duplicate_of_wildcard_removed() {
        let batch = ["*.example.com", "example.com", "sub.example.com"];
        assert_eq!(dedup_wildcards(&batch), vec!["*.example.com", "sub.example.com"]);
    }

    #[test]
    fn test_wildcard_without_literal_kept() {
        let batch = ["*.example.com", "other.com"];
        assert_eq!(dedup_wildcards(&batch), vec!["*.example.com", "other.com"]);
    }

    #[test]
    fn test_repeated_literals_all_removed() {
        let batch = ["example.com", "*.example.com", "example.com"];
        assert_eq!(dedup_wildcards(&batch), vec!["*.example.com"]);
    }

    #[test]
    fn test_empty_batch() {
        assert!(dedup_wildcards::<&str>(&[]).is_empty());
    }
}
