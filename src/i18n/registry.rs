//! Locale registry: the locales that must have search documents.
//!
//! A registry is load-time configuration. Entity types either carry their own
//! override list or fall back to the process-wide registry, which is installed
//! once and immutable thereafter.

use crate::error::ConfigError;
use crate::i18n::Locale;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Ordered, duplicate-free list of supported locales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleRegistry {
    locales: Vec<Locale>,
}

/// Global registry instance (installed explicitly or initialized lazily)
static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

/// Locale list used when nothing was installed.
const DEFAULT_LOCALES: &[&str] = &["en"];

impl LocaleRegistry {
    /// Build a registry from locale codes.
    ///
    /// Order is preserved; it determines the order of per-locale writes and
    /// report entries.
    ///
    /// # Returns
    /// * `Err(ConfigError::EmptyLocales)` for an empty list
    /// * `Err(ConfigError::DuplicateLocale)` if a code appears twice
    /// * `Err(ConfigError::InvalidLocale)` for a malformed code
    pub fn new<I, S>(codes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut locales = Vec::new();

        for code in codes {
            let locale = Locale::parse(code.as_ref())?;
            if !seen.insert(locale.clone()) {
                return Err(ConfigError::DuplicateLocale(locale.to_string()));
            }
            locales.push(locale);
        }

        if locales.is_empty() {
            return Err(ConfigError::EmptyLocales);
        }

        Ok(Self { locales })
    }

    /// Parse a comma separated list such as `"en,ja,zh-TW"`.
    pub fn from_list(list: &str) -> Result<Self, ConfigError> {
        Self::new(list.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }

    /// Install the process-wide registry.
    ///
    /// Must happen before the first call to [`LocaleRegistry::global`].
    pub fn install(registry: LocaleRegistry) -> Result<(), ConfigError> {
        REGISTRY
            .set(registry)
            .map_err(|_| ConfigError::RegistryAlreadyInstalled)
    }

    /// Get the process-wide registry, falling back to `["en"]`.
    pub fn global() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: DEFAULT_LOCALES
                .iter()
                .filter_map(|code| Locale::parse(code).ok())
                .collect(),
        })
    }

    /// Check whether a locale is registered.
    pub fn contains(&self, locale: &Locale) -> bool {
        self.locales.contains(locale)
    }

    /// Look up a registered locale by code.
    pub fn get_by_code(&self, code: &str) -> Option<&Locale> {
        self.locales.iter().find(|locale| locale.code() == code)
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Locale> {
        self.locales.iter()
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }
}
