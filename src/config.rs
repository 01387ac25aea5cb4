use crate::entity_type::EntityType;
use crate::i18n::LocaleRegistry;
use crate::mapping::{FlattenMapper, PartitionMapper, SharedChangePolicy};
use crate::retry::RetryConfig;
use crate::sync::WriteScope;
use anyhow::{bail, Context, Result};

/// How documents of the configured entity type are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStrategy {
    Flatten,
    Partition(SharedChangePolicy),
}

#[derive(Debug, Clone)]
pub struct Config {
    // Search engine
    pub search_url: String,
    pub search_max_attempts: u32,
    pub create_indices: bool,

    // Relational store
    pub database_url: String,

    // Entity type
    pub entity_name: String,
    pub entity_table: String,
    pub translated_attributes: Vec<String>,
    pub shared_attributes: Vec<String>,
    pub available_locales: LocaleRegistry,
    pub index_strategy: IndexStrategy,

    // Reindex
    pub reindex_locale: Option<String>,
}

/// Comma separated list, blanks dropped.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_strategy(strategy: &str, policy: Option<&str>) -> Result<IndexStrategy> {
    match strategy.trim().to_lowercase().as_str() {
        "flatten" => Ok(IndexStrategy::Flatten),
        "partition" => {
            let policy = policy.context(
                "SHARED_CHANGE_POLICY must be set (ignore|propagate) when INDEX_STRATEGY=partition",
            )?;
            let policy = match policy.trim().to_lowercase().as_str() {
                "ignore" => SharedChangePolicy::Ignore,
                "propagate" => SharedChangePolicy::PropagateToExisting,
                other => bail!(
                    "Unknown SHARED_CHANGE_POLICY '{}' (expected ignore|propagate)",
                    other
                ),
            };
            Ok(IndexStrategy::Partition(policy))
        }
        other => bail!("Unknown INDEX_STRATEGY '{}' (expected flatten|partition)", other),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let entity_name = std::env::var("ENTITY_NAME").context("ENTITY_NAME not set")?;

        let translated_attributes = parse_list(
            &std::env::var("TRANSLATED_ATTRIBUTES").context("TRANSLATED_ATTRIBUTES not set")?,
        );
        if translated_attributes.is_empty() {
            bail!("TRANSLATED_ATTRIBUTES is empty");
        }

        let available_locales = LocaleRegistry::from_list(
            &std::env::var("AVAILABLE_LOCALES").unwrap_or_else(|_| "en".to_string()),
        )
        .context("Invalid AVAILABLE_LOCALES")?;

        let index_strategy = parse_strategy(
            &std::env::var("INDEX_STRATEGY").unwrap_or_else(|_| "flatten".to_string()),
            std::env::var("SHARED_CHANGE_POLICY").ok().as_deref(),
        )?;

        let search_max_attempts = match std::env::var("SEARCH_MAX_ATTEMPTS") {
            Ok(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts >= 1)
                .with_context(|| format!("Invalid SEARCH_MAX_ATTEMPTS '{}'", value))?,
            Err(_) => 3,
        };

        Ok(Self {
            // Search engine
            search_url: std::env::var("SEARCH_URL")
                .unwrap_or_else(|_| "http://localhost:9200".to_string()),
            search_max_attempts,
            create_indices: std::env::var("CREATE_INDICES")
                .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
                .unwrap_or(false),

            // Relational store
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,

            // Entity type
            entity_table: std::env::var("ENTITY_TABLE")
                .unwrap_or_else(|_| format!("{}s", entity_name)),
            entity_name,
            translated_attributes,
            shared_attributes: std::env::var("SHARED_ATTRIBUTES")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            available_locales,
            index_strategy,

            // Reindex
            reindex_locale: std::env::var("REINDEX_LOCALE")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    /// Register the configured entity type.
    pub fn entity_type(&self) -> Result<EntityType> {
        let builder = EntityType::builder(self.entity_name.as_str())
            .collection(self.entity_table.as_str())
            .translates(self.translated_attributes.iter().map(String::as_str))
            .shared(self.shared_attributes.iter().map(String::as_str))
            .locales(self.available_locales.iter().map(|locale| locale.code()));

        let builder = match self.index_strategy {
            IndexStrategy::Flatten => builder.flatten(FlattenMapper::new()),
            IndexStrategy::Partition(policy) => builder.partition(PartitionMapper::new(policy)),
        };

        builder
            .build()
            .with_context(|| format!("Invalid entity type '{}'", self.entity_name))
    }

    /// Write scope of the reindex run.
    pub fn scope(&self, ty: &EntityType) -> Result<WriteScope> {
        match &self.reindex_locale {
            None => Ok(WriteScope::AllLocales),
            Some(code) => {
                let locale = ty
                    .require_locale(code)
                    .context("Invalid REINDEX_LOCALE")?;
                Ok(WriteScope::Locale(locale.clone()))
            }
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::search_write().with_max_attempts(self.search_max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Locale;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "SEARCH_URL",
        "SEARCH_MAX_ATTEMPTS",
        "CREATE_INDICES",
        "DATABASE_URL",
        "ENTITY_NAME",
        "ENTITY_TABLE",
        "TRANSLATED_ATTRIBUTES",
        "SHARED_ATTRIBUTES",
        "AVAILABLE_LOCALES",
        "INDEX_STRATEGY",
        "SHARED_CHANGE_POLICY",
        "REINDEX_LOCALE",
    ];

    fn set_env(pairs: &[(&str, &str)]) {
        for var in VARS {
            std::env::remove_var(var);
        }
        for (key, value) in pairs {
            std::env::set_var(key, value);
        }
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://localhost/test"),
            ("ENTITY_NAME", "article"),
            ("TRANSLATED_ATTRIBUTES", "title, body"),
        ]
    }

    // ==================== from_env Tests ====================

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        set_env(&minimal());
        let config = Config::from_env().expect("Should load");

        assert_eq!(config.search_url, "http://localhost:9200");
        assert_eq!(config.search_max_attempts, 3);
        assert!(!config.create_indices);
        assert_eq!(config.entity_table, "articles");
        assert_eq!(config.translated_attributes, vec!["title", "body"]);
        assert!(config.shared_attributes.is_empty());
        assert_eq!(config.available_locales.len(), 1);
        assert_eq!(config.index_strategy, IndexStrategy::Flatten);
        assert_eq!(config.reindex_locale, None);
    }

    #[test]
    #[serial]
    fn test_from_env_missing_required() {
        set_env(&[("ENTITY_NAME", "article"), ("TRANSLATED_ATTRIBUTES", "title")]);
        let error = Config::from_env().unwrap_err();
        assert!(error.to_string().contains("DATABASE_URL"));
    }

    #[test]
    #[serial]
    fn test_partition_requires_policy() {
        let mut vars = minimal();
        vars.push(("INDEX_STRATEGY", "partition"));
        set_env(&vars);
        let error = Config::from_env().unwrap_err();
        assert!(error.to_string().contains("SHARED_CHANGE_POLICY"));

        vars.push(("SHARED_CHANGE_POLICY", "propagate"));
        set_env(&vars);
        let config = Config::from_env().expect("Should load");
        assert_eq!(
            config.index_strategy,
            IndexStrategy::Partition(SharedChangePolicy::PropagateToExisting)
        );
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        let mut vars = minimal();
        vars.push(("SEARCH_MAX_ATTEMPTS", "0"));
        set_env(&vars);
        assert!(Config::from_env().is_err());

        let mut vars = minimal();
        vars.push(("AVAILABLE_LOCALES", "en,not a locale"));
        set_env(&vars);
        assert!(Config::from_env().is_err());

        let mut vars = minimal();
        vars.push(("INDEX_STRATEGY", "sharded"));
        set_env(&vars);
        assert!(Config::from_env().is_err());
    }

    // ==================== Entity Type Tests ====================

    #[test]
    #[serial]
    fn test_entity_type_and_scope() {
        let mut vars = minimal();
        vars.extend([
            ("AVAILABLE_LOCALES", "en,ja"),
            ("SHARED_ATTRIBUTES", "code"),
            ("INDEX_STRATEGY", "partition"),
            ("SHARED_CHANGE_POLICY", "ignore"),
            ("REINDEX_LOCALE", "ja"),
            ("SEARCH_MAX_ATTEMPTS", "5"),
        ]);
        set_env(&vars);
        let config = Config::from_env().expect("Should load");

        let ty = config.entity_type().expect("Should build");
        assert_eq!(ty.collection(), "articles");
        assert_eq!(ty.mapper().strategy_name(), "partition");
        assert!(ty.is_shared("code"));
        assert_eq!(
            config.scope(&ty).unwrap(),
            WriteScope::Locale(Locale::parse("ja").unwrap())
        );
        assert_eq!(config.retry_config().max_attempts, 5);
    }

    #[test]
    #[serial]
    fn test_scope_rejects_unregistered_locale() {
        let mut vars = minimal();
        vars.push(("REINDEX_LOCALE", "fr"));
        set_env(&vars);
        let config = Config::from_env().expect("Should load");
        let ty = config.entity_type().expect("Should build");

        assert!(config.scope(&ty).is_err());
    }
}
