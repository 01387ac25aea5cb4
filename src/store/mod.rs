//! Relational store holding translated records.
//!
//! The store owns persistence of the record and its translations table.
//! Synchronization only reads snapshots and translation rows from it.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::entity::{EntityId, EntitySnapshot, TranslatedEntity};
use crate::error::StoreError;
use crate::i18n::Locale;
use async_trait::async_trait;

/// One row of the translations table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRow {
    pub locale: Locale,
    pub persisted: bool,
}

#[async_trait]
pub trait TranslationStore: Send + Sync {
    /// Committed state of a record, or `None` if it does not exist.
    async fn load(&self, id: EntityId) -> Result<Option<EntitySnapshot>, StoreError>;

    /// Commit shared attributes and pending translation edits.
    ///
    /// Assigns a primary key to new records. Returns the committed snapshot.
    async fn save(&self, entity: &TranslatedEntity) -> Result<EntitySnapshot, StoreError>;

    /// Translation rows of one record, read directly from storage.
    async fn list_translations(&self, id: EntityId) -> Result<Vec<TranslationRow>, StoreError>;

    /// Every record id, ascending.
    async fn list_ids(&self) -> Result<Vec<EntityId>, StoreError>;

    /// Remove a record and its translations.
    async fn delete(&self, id: EntityId) -> Result<(), StoreError>;
}
