//! Translated records as seen by the synchronizer.
//!
//! A `TranslatedEntity` is the in-memory, possibly dirty view of a record.
//! An `EntitySnapshot` is what the relational store last committed.

use crate::i18n::Locale;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Primary key of a translated record.
pub type EntityId = i64;

/// Attribute name to value.
pub type Attributes = BTreeMap<String, Value>;

/// One locale's row in the translations table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub locale: Locale,
    /// Committed attribute values. Pending edits live in the entity's stash.
    pub attributes: Attributes,
    /// Flips to true once the owning entity has been saved.
    pub persisted: bool,
}

impl Translation {
    fn pending(locale: Locale) -> Self {
        Self {
            locale,
            attributes: Attributes::new(),
            persisted: false,
        }
    }
}

/// Committed state of a record, as returned by the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub shared: Attributes,
    pub translations: BTreeMap<Locale, Attributes>,
}

impl EntitySnapshot {
    pub fn translation(&self, locale: &Locale) -> Option<&Attributes> {
        self.translations.get(locale)
    }
}

/// A record with locale-independent (shared) and locale-dependent
/// (translated) attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranslatedEntity {
    id: Option<EntityId>,
    shared: Attributes,
    translations: BTreeMap<Locale, Translation>,
    stash: BTreeMap<Locale, Attributes>,
}

impl TranslatedEntity {
    /// A record that has never been saved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the clean in-memory view of a committed record.
    pub fn from_snapshot(snapshot: &EntitySnapshot) -> Self {
        let translations = snapshot
            .translations
            .iter()
            .map(|(locale, attributes)| {
                (
                    locale.clone(),
                    Translation {
                        locale: locale.clone(),
                        attributes: attributes.clone(),
                        persisted: true,
                    },
                )
            })
            .collect();

        Self {
            id: Some(snapshot.id),
            shared: snapshot.shared.clone(),
            translations,
            stash: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// True until the store has assigned a primary key.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn set_shared(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.shared.insert(attribute.into(), value.into());
    }

    /// Write a translated attribute in an explicit locale.
    ///
    /// Creates an unpersisted `Translation` the first time a locale is touched.
    pub fn set_translated(
        &mut self,
        locale: &Locale,
        attribute: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.translations
            .entry(locale.clone())
            .or_insert_with(|| Translation::pending(locale.clone()));
        self.stash
            .entry(locale.clone())
            .or_default()
            .insert(attribute.into(), value.into());
    }

    pub fn shared_value(&self, attribute: &str) -> Option<&Value> {
        self.shared.get(attribute)
    }

    pub fn shared_attributes(&self) -> &Attributes {
        &self.shared
    }

    /// Resolve a translated attribute: a pending edit wins, then the
    /// persisted translation, then nothing.
    pub fn translated_value(&self, locale: &Locale, attribute: &str) -> Option<&Value> {
        if let Some(value) = self.stash.get(locale).and_then(|attrs| attrs.get(attribute)) {
            return Some(value);
        }
        self.translations
            .get(locale)
            .filter(|translation| translation.persisted)
            .and_then(|translation| translation.attributes.get(attribute))
    }

    pub fn translation(&self, locale: &Locale) -> Option<&Translation> {
        self.translations.get(locale)
    }

    pub fn translations(&self) -> impl Iterator<Item = &Translation> {
        self.translations.values()
    }

    /// Pending, unsaved edits by locale.
    pub fn pending(&self) -> &BTreeMap<Locale, Attributes> {
        &self.stash
    }

    pub fn has_pending(&self) -> bool {
        self.stash.values().any(|attrs| !attrs.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn locale(code: &str) -> Locale {
        Locale::parse(code).unwrap()
    }

    // ==================== Value Resolution Tests ====================

    #[test]
    fn test_new_entity_has_no_values() {
        let entity = TranslatedEntity::new();
        assert!(entity.is_new());
        assert_eq!(entity.translated_value(&locale("en"), "title"), None);
    }

    #[test]
    fn test_set_translated_is_locale_scoped() {
        let mut entity = TranslatedEntity::new();
        entity.set_translated(&locale("en"), "title", "English");

        assert_eq!(
            entity.translated_value(&locale("en"), "title"),
            Some(&json!("English"))
        );
        assert_eq!(entity.translated_value(&locale("ja"), "title"), None);
    }

    #[test]
    fn test_set_translated_creates_unpersisted_translation() {
        let mut entity = TranslatedEntity::new();
        entity.set_translated(&locale("ja"), "title", "日本語");

        let translation = entity.translation(&locale("ja")).expect("Should exist");
        assert!(!translation.persisted);
        assert!(translation.attributes.is_empty());
    }

    #[test]
    fn test_pending_edit_wins_over_persisted() {
        let snapshot = EntitySnapshot {
            id: 1,
            shared: Attributes::new(),
            translations: BTreeMap::from([(
                locale("en"),
                Attributes::from([("title".to_string(), json!("old"))]),
            )]),
        };
        let mut entity = TranslatedEntity::from_snapshot(&snapshot);
        assert_eq!(
            entity.translated_value(&locale("en"), "title"),
            Some(&json!("old"))
        );

        entity.set_translated(&locale("en"), "title", "new");
        assert_eq!(
            entity.translated_value(&locale("en"), "title"),
            Some(&json!("new"))
        );
    }

    // ==================== Snapshot Tests ====================

    #[test]
    fn test_from_snapshot_is_clean() {
        let snapshot = EntitySnapshot {
            id: 7,
            shared: Attributes::from([("code".to_string(), json!("x"))]),
            translations: BTreeMap::from([(locale("en"), Attributes::new())]),
        };
        let entity = TranslatedEntity::from_snapshot(&snapshot);

        assert_eq!(entity.id(), Some(7));
        assert!(!entity.has_pending());
        assert!(entity.translation(&locale("en")).unwrap().persisted);
        assert_eq!(entity.shared_value("code"), Some(&json!("x")));
    }
}
