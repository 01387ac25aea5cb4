//! Keep a search index consistent with translated relational records.
//!
//! Records have shared attributes and per-locale translated attributes.
//! After every committed save the pipeline writes the search documents of
//! the affected locales, using one of two layouts:
//!
//! - flatten: one document per record, `{attribute}_{locale}` fields
//! - partition: one document per locale, in a locale-specific index

pub mod config;
pub mod entity;
pub mod entity_type;
pub mod error;
pub mod i18n;
pub mod mapping;
pub mod retry;
pub mod search;
pub mod store;
pub mod sync;
pub mod tracking;

pub use entity::{Attributes, EntityId, EntitySnapshot, TranslatedEntity, Translation};
pub use entity_type::{EntityType, EntityTypeBuilder};
pub use error::{ConfigError, StoreError, SyncError, SyncResult};
pub use i18n::{Locale, LocaleRegistry};
pub use mapping::{FieldMapper, FlattenMapper, LocalizedName, PartitionMapper, SharedChangePolicy};
pub use search::{ElasticsearchClient, RecordingSearchClient, SearchClient, SearchError};
pub use store::{MemoryStore, PgStore, TranslationStore};
pub use sync::{
    Record, ReindexStats, ReindexSummary, Reindexer, SyncEngine, SyncPipeline, SyncReport,
    WriteScope,
};
pub use tracking::{ChangeSet, ChangeTracker, ExistenceMap, ExistenceTracker};
