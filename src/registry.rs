//! Supported language pair registry

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Language combinations with a published Helsinki-NLP opus-mt model.
///
/// This is the policy catalog: what the service claims to support. It is
/// independent of what is actually resident in the model store at any moment.
const KNOWN_PAIRS: &[(&str, &str)] = &[
    ("en", "de"),
    ("de", "en"),
    ("en", "fr"),
    ("fr", "en"),
    ("en", "es"),
    ("es", "en"),
    ("en", "ru"),
    ("ru", "en"),
    ("en", "it"),
    ("it", "en"),
    ("en", "zh"),
    ("zh", "en"),
    ("en", "ja"),
    ("ja", "en"),
    ("en", "nl"),
    ("nl", "en"),
];

/// A source -> target language combination, keyed as `"source-target"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LanguagePair {
    /// Source language code, e.g. `"en"`.
    pub source: String,
    /// Target language code, e.g. `"de"`.
    pub target: String,
}

impl LanguagePair {
    /// Create a new language pair.
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    /// Cache and registry key, e.g. `"en-de"`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.source, self.target)
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

impl FromStr for LanguagePair {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, target) = s
            .split_once('-')
            .ok_or_else(|| Error::Config(format!("invalid language pair: '{}'", s)))?;

        if !is_language_code(source) || !is_language_code(target) {
            return Err(Error::Config(format!("invalid language pair: '{}'", s)));
        }

        Ok(Self::new(source, target))
    }
}

/// Check a language code against the accepted shape: two lowercase letters
/// with an optional two-letter region suffix (`en`, `zh-cn`).
pub fn is_language_code(code: &str) -> bool {
    let mut parts = code.split('-');
    let base = match parts.next() {
        Some(base) => base,
        None => return false,
    };

    let valid_segment = |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_lowercase());

    if !valid_segment(base) {
        return false;
    }

    match parts.next() {
        None => true,
        Some(region) => valid_segment(region) && parts.next().is_none(),
    }
}

/// Ordered, read-only set of supported language pairs.
///
/// Computed once at startup from the fixed catalog and never mutated, even
/// when models for other pairs end up in the store.
#[derive(Debug, Clone)]
pub struct SupportedPairs {
    pairs: Vec<LanguagePair>,
}

impl SupportedPairs {
    /// Build the registry from the built-in catalog.
    pub fn from_catalog() -> Self {
        let pairs = KNOWN_PAIRS
            .iter()
            .map(|(source, target)| LanguagePair::new(source, target))
            .collect();
        Self { pairs }
    }

    /// Registry membership check; gates request acceptance.
    pub fn contains(&self, pair: &LanguagePair) -> bool {
        self.pairs.contains(pair)
    }

    /// Iterate pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &LanguagePair> {
        self.pairs.iter()
    }

    /// Pair keys in catalog order, e.g. `["en-de", "de-en", ...]`.
    pub fn keys(&self) -> Vec<String> {
        self.pairs.iter().map(LanguagePair::key).collect()
    }

    /// Number of supported pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_roundtrip() {
        let pair = LanguagePair::new("en", "de");
        assert_eq!(pair.key(), "en-de");
        assert_eq!("en-de".parse::<LanguagePair>().unwrap(), pair);
    }

    #[test]
    fn test_pair_parse_region_suffix() {
        let pair: LanguagePair = "en-zh-cn".parse().unwrap();
        assert_eq!(pair.source, "en");
        assert_eq!(pair.target, "zh-cn");
    }

    #[test]
    fn test_pair_parse_rejects_garbage() {
        assert!("ende".parse::<LanguagePair>().is_err());
        assert!("EN-DE".parse::<LanguagePair>().is_err());
        assert!("e-d".parse::<LanguagePair>().is_err());
        assert!("-de".parse::<LanguagePair>().is_err());
    }

    #[test]
    fn test_language_code_shapes() {
        assert!(is_language_code("en"));
        assert!(is_language_code("zh-cn"));
        assert!(!is_language_code("eng"));
        assert!(!is_language_code("EN"));
        assert!(!is_language_code("zh-"));
        assert!(!is_language_code("zh-cn-tw"));
    }

    #[test]
    fn test_catalog_membership() {
        let pairs = SupportedPairs::from_catalog();
        assert_eq!(pairs.len(), 16);
        assert!(pairs.contains(&LanguagePair::new("en", "de")));
        assert!(pairs.contains(&LanguagePair::new("ja", "en")));
        assert!(!pairs.contains(&LanguagePair::new("xx", "yy")));
        // Reverse of a supported pair is supported, identity is not a pair
        assert!(!pairs.contains(&LanguagePair::new("en", "en")));
    }

    #[test]
    fn test_catalog_order_is_stable() {
        let pairs = SupportedPairs::from_catalog();
        let keys = pairs.keys();
        assert_eq!(keys[0], "en-de");
        assert_eq!(keys[1], "de-en");
        assert_eq!(keys[keys.len() - 1], "nl-en");
    }
}
