//! Per-save change detection.

use crate::entity::{Attributes, EntitySnapshot, TranslatedEntity};
use crate::entity_type::EntityType;
use crate::i18n::Locale;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Changed attributes per locale for one save.
///
/// A locale is present only if at least one translated attribute changed in
/// it. Each entry already includes the shared-attribute changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    locales: BTreeMap<Locale, Attributes>,
    common: Attributes,
    created: BTreeSet<Locale>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn contains(&self, locale: &Locale) -> bool {
        self.locales.contains_key(locale)
    }

    /// Changes of one locale, shared changes included.
    pub fn get(&self, locale: &Locale) -> Option<&Attributes> {
        self.locales.get(locale)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Locale, &Attributes)> {
        self.locales.iter()
    }

    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.locales.keys()
    }

    /// Changed shared attributes, whether or not any locale qualified.
    pub fn common(&self) -> &Attributes {
        &self.common
    }

    /// True if the locale had no committed translation before this save.
    pub fn is_created(&self, locale: &Locale) -> bool {
        self.created.contains(locale)
    }

    /// The same change set limited to one locale.
    pub fn restrict_to(&self, locale: &Locale) -> ChangeSet {
        ChangeSet {
            locales: self
                .locales
                .iter()
                .filter(|(l, _)| *l == locale)
                .map(|(l, a)| (l.clone(), a.clone()))
                .collect(),
            common: self.common.clone(),
            created: self.created.iter().filter(|l| *l == locale).cloned().collect(),
        }
    }
}

pub struct ChangeTracker;

impl ChangeTracker {
    /// Diff an entity against the snapshot it was loaded from.
    ///
    /// `prior` is `None` for a record that was never saved.
    pub fn compute(
        ty: &EntityType,
        entity: &TranslatedEntity,
        prior: Option<&EntitySnapshot>,
    ) -> ChangeSet {
        let common = Self::common_changes(ty, entity, prior);
        let mut locales = BTreeMap::new();
        let mut created = BTreeSet::new();

        for (locale, stash) in entity.pending() {
            if !ty.locales().contains(locale) {
                warn!(
                    "{}: ignoring edits in unregistered locale {}",
                    ty.name(),
                    locale
                );
                continue;
            }

            let committed = prior.and_then(|snapshot| snapshot.translation(locale));
            let is_created = committed.is_none();

            let changes: Attributes = stash
                .iter()
                .filter(|(attribute, _)| ty.is_translated(attribute))
                .filter(|(attribute, value)| {
                    is_created || committed.and_then(|c| c.get(*attribute)) != Some(*value)
                })
                .map(|(attribute, value)| (attribute.clone(), value.clone()))
                .collect();

            if changes.is_empty() {
                continue;
            }

            let mut merged = changes;
            merged.extend(common.iter().map(|(k, v)| (k.clone(), v.clone())));
            if is_created {
                created.insert(locale.clone());
            }
            locales.insert(locale.clone(), merged);
        }

        debug!(
            "{}: change set covers {} locale(s), {} shared change(s)",
            ty.name(),
            locales.len(),
            common.len()
        );

        ChangeSet {
            locales,
            common,
            created,
        }
    }

    fn common_changes(
        ty: &EntityType,
        entity: &TranslatedEntity,
        prior: Option<&EntitySnapshot>,
    ) -> Attributes {
        let mut common = Attributes::new();
        for attribute in ty.shared_attributes() {
            let current = entity.shared_value(attribute).unwrap_or(&Value::Null);
            let previous = prior
                .and_then(|snapshot| snapshot.shared.get(attribute))
                .unwrap_or(&Value::Null);
            if current != previous {
                common.insert(attribute.clone(), current.clone());
            }
        }
        common
    }
}
