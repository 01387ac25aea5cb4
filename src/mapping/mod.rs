//! Projection of translated entities into search documents.
//!
//! - `flatten`: one document, one field per (attribute, locale)
//! - `partition`: one document per locale in a locale-specific index
//! - `naming`: pluggable naming functions and their injectivity check

mod flatten;
mod naming;
mod partition;

pub use flatten::FlattenMapper;
pub use naming::{ensure_injective, LocalizedName};
pub use partition::{PartitionMapper, SharedChangePolicy};

use crate::entity_type::EntityType;
use crate::error::ConfigError;

/// A search document body.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field carrying the entity primary key in every document.
pub const ID_FIELD: &str = "id";

/// Strategy selected per entity type at registration.
#[derive(Debug, Clone)]
pub enum FieldMapper {
    Flatten(FlattenMapper),
    Partition(PartitionMapper),
}

impl Default for FieldMapper {
    fn default() -> Self {
        FieldMapper::Flatten(FlattenMapper::default())
    }
}

impl FieldMapper {
    pub(crate) fn resolve(self, name: &str, collection: &str) -> Self {
        match self {
            FieldMapper::Flatten(mapper) => FieldMapper::Flatten(mapper.resolve(name, collection)),
            FieldMapper::Partition(mapper) => {
                FieldMapper::Partition(mapper.resolve(name, collection))
            }
        }
    }

    pub(crate) fn check(&self, ty: &EntityType) -> Result<(), ConfigError> {
        match self {
            FieldMapper::Flatten(mapper) => mapper.check(ty),
            FieldMapper::Partition(mapper) => mapper.check(ty),
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        match self {
            FieldMapper::Flatten(_) => "flatten",
            FieldMapper::Partition(_) => "partition",
        }
    }
}
