//! Locale type: validated locale code.
//!
//! Locales are threaded explicitly through every call. There is no ambient
//! "current locale".

use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A validated locale code (e.g., "en", "ja", "zh-TW").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

fn locale_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,3}([-_][A-Za-z0-9]{2,8})*$").expect("locale pattern is valid")
    })
}

impl Locale {
    /// Parse and validate a locale code.
    ///
    /// # Returns
    /// * `Ok(Locale)` if the code looks like a BCP 47-ish tag
    /// * `Err(ConfigError::InvalidLocale)` otherwise
    pub fn parse(code: &str) -> Result<Locale, ConfigError> {
        let code = code.trim();
        if locale_pattern().is_match(code) {
            Ok(Locale(code.to_string()))
        } else {
            Err(ConfigError::InvalidLocale(code.to_string()))
        }
    }

    /// The locale code as given at parse time.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// The code with `-` replaced by `_`, usable inside field names.
    pub fn field_suffix(&self) -> String {
        self.0.replace('-', "_")
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Locale {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Locale::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== parse Tests ====================

    #[test]
    fn test_parse_simple_code() {
        let locale = Locale::parse("en").expect("Should parse");
        assert_eq!(locale.code(), "en");
    }

    #[test]
    fn test_parse_region_code() {
        let locale = Locale::parse("zh-TW").expect("Should parse");
        assert_eq!(locale.code(), "zh-TW");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let locale = Locale::parse("  ja ").expect("Should parse");
        assert_eq!(locale.code(), "ja");
    }

    #[test]
    fn test_parse_empty_fails() {
        assert_eq!(
            Locale::parse(""),
            Err(ConfigError::InvalidLocale(String::new()))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Locale::parse("e").is_err());
        assert!(Locale::parse("en/../x").is_err());
        assert!(Locale::parse("en-").is_err());
        assert!(Locale::parse("english language").is_err());
    }

    // ==================== Formatting Tests ====================

    #[test]
    fn test_field_suffix_replaces_dash() {
        let locale = Locale::parse("zh-TW").unwrap();
        assert_eq!(locale.field_suffix(), "zh_TW");
    }

    #[test]
    fn test_display() {
        let locale = Locale::parse("pt-BR").unwrap();
        assert_eq!(locale.to_string(), "pt-BR");
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let locale: Locale = serde_json::from_str("\"ja\"").expect("Should deserialize");
        assert_eq!(locale.code(), "ja");

        let invalid: Result<Locale, _> = serde_json::from_str("\"!!\"");
        assert!(invalid.is_err());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let en = Locale::parse("en").unwrap();
        let ja = Locale::parse("ja").unwrap();
        assert!(en < ja);
    }
}
