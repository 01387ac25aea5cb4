//! Which locales already have a committed translation, read from the store.

use crate::entity::EntityId;
use crate::error::StoreError;
use crate::i18n::Locale;
use crate::store::{TranslationRow, TranslationStore};
use std::collections::BTreeSet;
use tracing::debug;

/// Locales with a persisted translation as of one store read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistenceMap {
    locales: BTreeSet<Locale>,
}

impl ExistenceMap {
    pub fn from_rows(rows: impl IntoIterator<Item = TranslationRow>) -> Self {
        rows.into_iter()
            .filter(|row| row.persisted)
            .map(|row| row.locale)
            .collect()
    }

    pub fn exists(&self, locale: &Locale) -> bool {
        self.locales.contains(locale)
    }

    /// True if any locale has a persisted translation.
    pub fn any(&self) -> bool {
        !self.locales.is_empty()
    }

    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.locales.iter()
    }

    /// Locales present in `previous` but gone now.
    pub fn vanished_since(&self, previous: &ExistenceMap) -> Vec<Locale> {
        previous.locales.difference(&self.locales).cloned().collect()
    }

    pub fn union(&self, other: &ExistenceMap) -> ExistenceMap {
        self.locales.union(&other.locales).cloned().collect()
    }
}

impl FromIterator<Locale> for ExistenceMap {
    fn from_iter<T: IntoIterator<Item = Locale>>(iter: T) -> Self {
        Self {
            locales: iter.into_iter().collect(),
        }
    }
}

pub struct ExistenceTracker;

impl ExistenceTracker {
    /// Read the authoritative translation rows of one entity.
    ///
    /// Never derived from in-memory state.
    pub async fn compute<S>(store: &S, id: EntityId) -> Result<ExistenceMap, StoreError>
    where
        S: TranslationStore + ?Sized,
    {
        let rows = store.list_translations(id).await?;
        let map = ExistenceMap::from_rows(rows);
        debug!(
            "Entity {}: {} persisted translation(s)",
            id,
            map.locales.len()
        );
        Ok(map)
    }
}
