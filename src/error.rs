use thiserror::Error;

use crate::entity::EntityId;

/// Registration-time configuration failures.
///
/// These surface from `LocaleRegistry::new` and `EntityType::builder(..).build()`,
/// never from a save.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid locale code: '{0}'")]
    InvalidLocale(String),

    #[error("Locale list is empty")]
    EmptyLocales,

    #[error("Locale '{0}' is listed more than once")]
    DuplicateLocale(String),

    #[error("Attribute '{0}' is declared more than once")]
    DuplicateAttribute(String),

    #[error("Entity type '{0}' declares no translated attributes")]
    NoTranslatedAttributes(String),

    #[error("Name '{name}' is produced by both {first} and {second}")]
    NamingCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Locale '{0}' is not registered for this entity type")]
    UnknownLocale(String),

    #[error("Global locale registry is already installed")]
    RegistryAlreadyInstalled,
}

/// Relational store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Entity {0} not found")]
    NotFound(EntityId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid table name: '{0}'")]
    InvalidTable(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Failures that abort a pipeline step.
///
/// Search-side write failures are never raised through this type; they are
/// collected per locale in a `SyncReport`.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type SyncResult<T> = Result<T, SyncError>;
