//! Partition strategy: one document per locale under plain attribute names,
//! each stored in a locale-specific index.

use super::naming::{ensure_injective, LocalizedName};
use super::{Document, ID_FIELD};
use crate::entity::{Attributes, EntityId, TranslatedEntity};
use crate::entity_type::EntityType;
use crate::error::ConfigError;
use crate::i18n::Locale;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

type MappingFn = dyn Fn(&Locale) -> Value + Send + Sync;

/// What a save that only touched shared attributes does to locale documents.
///
/// Has no `Default`; every partitioned entity type picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedChangePolicy {
    /// No writes.
    Ignore,
    /// One partial update per locale whose document is known to exist.
    PropagateToExisting,
}

#[derive(Clone)]
pub struct PartitionMapper {
    shared_change_policy: SharedChangePolicy,
    index_name_base: Option<String>,
    document_type_base: Option<String>,
    index_naming: LocalizedName,
    type_naming: LocalizedName,
    mapping: Option<Arc<MappingFn>>,
}

impl PartitionMapper {
    pub fn new(shared_change_policy: SharedChangePolicy) -> Self {
        Self {
            shared_change_policy,
            index_name_base: None,
            document_type_base: None,
            index_naming: LocalizedName::partition_default(),
            type_naming: LocalizedName::partition_default(),
            mapping: None,
        }
    }

    pub fn with_index_name_base(mut self, base: impl Into<String>) -> Self {
        self.index_name_base = Some(base.into());
        self
    }

    pub fn with_document_type_base(mut self, base: impl Into<String>) -> Self {
        self.document_type_base = Some(base.into());
        self
    }

    pub fn with_index_naming(mut self, naming: LocalizedName) -> Self {
        self.index_naming = naming;
        self
    }

    pub fn with_type_naming(mut self, naming: LocalizedName) -> Self {
        self.type_naming = naming;
        self
    }

    /// Per-locale index body (settings and mappings), e.g. a different
    /// analyzer per language.
    pub fn with_mapping<F>(mut self, mapping: F) -> Self
    where
        F: Fn(&Locale) -> Value + Send + Sync + 'static,
    {
        self.mapping = Some(Arc::new(mapping));
        self
    }

    pub(crate) fn resolve(mut self, name: &str, collection: &str) -> Self {
        self.index_name_base
            .get_or_insert_with(|| collection.to_string());
        self.document_type_base.get_or_insert_with(|| name.to_string());
        self
    }

    pub fn shared_change_policy(&self) -> SharedChangePolicy {
        self.shared_change_policy
    }

    pub fn index_name_base(&self) -> &str {
        self.index_name_base.as_deref().unwrap_or_default()
    }

    pub fn document_type_base(&self) -> &str {
        self.document_type_base.as_deref().unwrap_or_default()
    }

    pub fn index_name(&self, locale: &Locale) -> String {
        self.index_naming.apply(self.index_name_base(), locale)
    }

    pub fn document_type(&self, locale: &Locale) -> String {
        self.type_naming.apply(self.document_type_base(), locale)
    }

    pub fn mapping_for(&self, locale: &Locale) -> Value {
        match &self.mapping {
            Some(mapping) => mapping(locale),
            None => Value::Object(Document::new()),
        }
    }

    /// Field set shared by every locale document.
    pub fn field_names(&self, ty: &EntityType) -> BTreeSet<String> {
        let mut fields = BTreeSet::from([ID_FIELD.to_string()]);
        fields.extend(ty.shared_attributes().iter().cloned());
        fields.extend(ty.translated_attributes().iter().cloned());
        fields
    }

    /// Full document of one locale.
    pub fn to_document(
        &self,
        ty: &EntityType,
        id: EntityId,
        entity: &TranslatedEntity,
        locale: &Locale,
    ) -> Document {
        let mut document = Document::new();
        document.insert(ID_FIELD.to_string(), Value::from(id));

        for attribute in ty.shared_attributes() {
            let value = entity.shared_value(attribute).cloned().unwrap_or(Value::Null);
            document.insert(attribute.clone(), value);
        }
        for attribute in ty.translated_attributes() {
            let value = entity
                .translated_value(locale, attribute)
                .cloned()
                .unwrap_or(Value::Null);
            document.insert(attribute.clone(), value);
        }

        document
    }

    /// Partial document restricted to fields the locale documents carry.
    pub fn partial_document(&self, ty: &EntityType, changes: &Attributes) -> Document {
        let fields = self.field_names(ty);
        changes
            .iter()
            .filter(|(attribute, _)| fields.contains(*attribute))
            .map(|(attribute, value)| (attribute.clone(), value.clone()))
            .collect()
    }

    pub(crate) fn check(&self, ty: &EntityType) -> Result<(), ConfigError> {
        ensure_injective(
            ty.locales()
                .iter()
                .map(|locale| (format!("index for {}", locale), self.index_name(locale))),
        )?;
        ensure_injective(
            ty.locales()
                .iter()
                .map(|locale| (format!("type for {}", locale), self.document_type(locale))),
        )
    }
}

impl fmt::Debug for PartitionMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionMapper")
            .field("shared_change_policy", &self.shared_change_policy)
            .field("index_name_base", &self.index_name_base)
            .field("document_type_base", &self.document_type_base)
            .field("index_naming", &self.index_naming)
            .field("type_naming", &self.type_naming)
            .field("mapping", &self.mapping.is_some())
            .finish()
    }
}
