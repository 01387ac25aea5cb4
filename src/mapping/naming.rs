//! Naming functions for localized field, index, and document-type names.

use crate::error::ConfigError;
use crate::i18n::Locale;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type NameFn = dyn Fn(&str, &Locale) -> String + Send + Sync;

/// Maps `(name, locale)` to a derived name.
///
/// Custom functions must be injective over the pairs they are applied to;
/// [`ensure_injective`] enforces that at registration time.
#[derive(Clone)]
pub struct LocalizedName {
    func: Arc<NameFn>,
    label: &'static str,
}

impl LocalizedName {
    /// `{attribute}_{locale}` with `-` in the locale replaced by `_`.
    pub fn field_default() -> Self {
        Self {
            func: Arc::new(|name, locale| format!("{}_{}", name, locale.field_suffix())),
            label: "field_default",
        }
    }

    /// `{base}-{locale}`.
    pub fn partition_default() -> Self {
        Self {
            func: Arc::new(|name, locale| format!("{}-{}", name, locale)),
            label: "partition_default",
        }
    }

    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&str, &Locale) -> String + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            label: "custom",
        }
    }

    pub fn apply(&self, name: &str, locale: &Locale) -> String {
        (self.func)(name, locale)
    }
}

impl fmt::Debug for LocalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalizedName").field(&self.label).finish()
    }
}

/// Fail if two distinct sources produce the same name.
///
/// Each item is `(source description, produced name)`.
pub fn ensure_injective<I>(names: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut seen: HashMap<String, String> = HashMap::new();
    for (source, name) in names {
        if let Some(first) = seen.get(&name) {
            return Err(ConfigError::NamingCollision {
                name,
                first: first.clone(),
                second: source,
            });
        }
        seen.insert(name, source);
    }
    Ok(())
}
