//! Flatten strategy: one document per entity, one field per (attribute, locale).

use super::naming::{ensure_injective, LocalizedName};
use super::{Document, ID_FIELD};
use crate::entity::{EntityId, TranslatedEntity};
use crate::entity_type::EntityType;
use crate::error::ConfigError;
use crate::i18n::Locale;
use crate::tracking::ChangeSet;
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct FlattenMapper {
    naming: LocalizedName,
    index_name: Option<String>,
    document_type: Option<String>,
    mapping: Option<Value>,
}

impl Default for FlattenMapper {
    fn default() -> Self {
        Self {
            naming: LocalizedName::field_default(),
            index_name: None,
            document_type: None,
            mapping: None,
        }
    }
}

impl FlattenMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the `{attribute}_{locale}` naming.
    pub fn with_naming(mut self, naming: LocalizedName) -> Self {
        self.naming = naming;
        self
    }

    /// Index name (defaults to the entity type's collection).
    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Document type (defaults to the entity type's name).
    pub fn with_document_type(mut self, name: impl Into<String>) -> Self {
        self.document_type = Some(name.into());
        self
    }

    /// Body sent when the index is created.
    pub fn with_mapping(mut self, mapping: Value) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub(crate) fn resolve(mut self, name: &str, collection: &str) -> Self {
        self.index_name.get_or_insert_with(|| collection.to_string());
        self.document_type.get_or_insert_with(|| name.to_string());
        self
    }

    pub fn index_name(&self) -> &str {
        self.index_name.as_deref().unwrap_or_default()
    }

    pub fn document_type(&self) -> &str {
        self.document_type.as_deref().unwrap_or_default()
    }

    pub fn mapping(&self) -> Value {
        self.mapping
            .clone()
            .unwrap_or_else(|| Value::Object(Document::new()))
    }

    pub fn localized_field_name(&self, attribute: &str, locale: &Locale) -> String {
        self.naming.apply(attribute, locale)
    }

    /// Exact field set of a flattened document.
    pub fn field_names(&self, ty: &EntityType) -> BTreeSet<String> {
        let mut fields = BTreeSet::from([ID_FIELD.to_string()]);
        fields.extend(ty.shared_attributes().iter().cloned());
        for attribute in ty.translated_attributes() {
            for locale in ty.locales().iter() {
                fields.insert(self.localized_field_name(attribute, locale));
            }
        }
        fields
    }

    /// Full document: shared attributes as-is, every translated attribute
    /// under its localized name for every registered locale.
    pub fn to_document(
        &self,
        ty: &EntityType,
        id: EntityId,
        entity: &TranslatedEntity,
    ) -> Document {
        let mut document = Document::new();
        document.insert(ID_FIELD.to_string(), Value::from(id));

        for attribute in ty.shared_attributes() {
            let value = entity.shared_value(attribute).cloned().unwrap_or(Value::Null);
            document.insert(attribute.clone(), value);
        }

        for attribute in ty.translated_attributes() {
            for locale in ty.locales().iter() {
                let value = entity
                    .translated_value(locale, attribute)
                    .cloned()
                    .unwrap_or(Value::Null);
                document.insert(self.localized_field_name(attribute, locale), value);
            }
        }

        document
    }

    /// Partial document covering every locale of a change set.
    pub fn partial_document(&self, ty: &EntityType, change_set: &ChangeSet) -> Document {
        let fields = self.field_names(ty);
        let mut document = Document::new();

        for (locale, changes) in change_set.iter() {
            for (attribute, value) in changes {
                let field = if ty.is_translated(attribute) {
                    self.localized_field_name(attribute, locale)
                } else {
                    attribute.clone()
                };
                if fields.contains(&field) {
                    document.insert(field, value.clone());
                }
            }
        }

        document
    }

    /// Partial document clearing every localized field of `locales`.
    pub fn cleared_locales<'a>(
        &self,
        ty: &EntityType,
        locales: impl IntoIterator<Item = &'a Locale>,
    ) -> Document {
        let mut document = Document::new();
        for locale in locales {
            for attribute in ty.translated_attributes() {
                document.insert(self.localized_field_name(attribute, locale), Value::Null);
            }
        }
        document
    }

    pub(crate) fn check(&self, ty: &EntityType) -> Result<(), ConfigError> {
        let mut names = vec![(format!("'{}'", ID_FIELD), ID_FIELD.to_string())];
        names.extend(
            ty.shared_attributes()
                .iter()
                .map(|a| (format!("shared attribute '{}'", a), a.clone())),
        );
        for attribute in ty.translated_attributes() {
            for locale in ty.locales().iter() {
                names.push((
                    format!("({}, {})", attribute, locale),
                    self.localized_field_name(attribute, locale),
                ));
            }
        }
        ensure_injective(names)
    }
}
