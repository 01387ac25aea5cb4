//! Entity-type registration.
//!
//! An `EntityType` fixes the attribute split, the locale list, and the
//! mapping strategy. It is validated once in `build` and immutable after.

use crate::error::ConfigError;
use crate::i18n::{Locale, LocaleRegistry};
use crate::mapping::{FieldMapper, FlattenMapper, PartitionMapper, ID_FIELD};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct EntityType {
    name: String,
    collection: String,
    translated: Vec<String>,
    shared: Vec<String>,
    locales: LocaleRegistry,
    mapper: FieldMapper,
}

impl EntityType {
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            collection: None,
            translated: Vec::new(),
            shared: Vec::new(),
            locales: None,
            mapper: FieldMapper::default(),
        }
    }

    /// Singular name, e.g. "article".
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plural collection name, e.g. "articles".
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn translated_attributes(&self) -> &[String] {
        &self.translated
    }

    pub fn shared_attributes(&self) -> &[String] {
        &self.shared
    }

    pub fn is_translated(&self, attribute: &str) -> bool {
        self.translated.iter().any(|a| a == attribute)
    }

    pub fn is_shared(&self, attribute: &str) -> bool {
        self.shared.iter().any(|a| a == attribute)
    }

    pub fn locales(&self) -> &LocaleRegistry {
        &self.locales
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    /// Resolve a locale code against this type's registry.
    pub fn require_locale(&self, code: &str) -> Result<&Locale, ConfigError> {
        self.locales
            .get_by_code(code)
            .ok_or_else(|| ConfigError::UnknownLocale(code.to_string()))
    }
}

pub struct EntityTypeBuilder {
    name: String,
    collection: Option<String>,
    translated: Vec<String>,
    shared: Vec<String>,
    locales: Option<Vec<String>>,
    mapper: FieldMapper,
}

impl EntityTypeBuilder {
    /// Collection name (defaults to `{name}s`).
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn translates<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.translated.extend(attributes.into_iter().map(Into::into));
        self
    }

    pub fn shared<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared.extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Override the process-wide locale registry for this type.
    pub fn locales<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locales = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn flatten(mut self, mapper: FlattenMapper) -> Self {
        self.mapper = FieldMapper::Flatten(mapper);
        self
    }

    pub fn partition(mut self, mapper: PartitionMapper) -> Self {
        self.mapper = FieldMapper::Partition(mapper);
        self
    }

    pub fn mapper(mut self, mapper: FieldMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn build(self) -> Result<EntityType, ConfigError> {
        if self.translated.is_empty() {
            return Err(ConfigError::NoTranslatedAttributes(self.name));
        }

        let mut seen = HashSet::from([ID_FIELD.to_string()]);
        for attribute in self.translated.iter().chain(self.shared.iter()) {
            if !seen.insert(attribute.clone()) {
                return Err(ConfigError::DuplicateAttribute(attribute.clone()));
            }
        }

        let locales = match self.locales {
            Some(codes) => LocaleRegistry::new(codes)?,
            None => LocaleRegistry::global().clone(),
        };

        let collection = self
            .collection
            .unwrap_or_else(|| format!("{}s", self.name));
        let mapper = self.mapper.resolve(&self.name, &collection);

        let ty = EntityType {
            name: self.name,
            collection,
            translated: self.translated,
            shared: self.shared,
            locales,
            mapper,
        };
        ty.mapper.check(&ty)?;
        Ok(ty)
    }
}
