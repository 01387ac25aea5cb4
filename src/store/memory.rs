use super::{TranslationRow, TranslationStore};
use crate::entity::{EntityId, EntitySnapshot, TranslatedEntity};
use crate::error::StoreError;
use crate::i18n::Locale;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: EntityId,
    rows: BTreeMap<EntityId, EntitySnapshot>,
}

/// Process-local store, used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop one translation row without touching the parent record, as an
    /// out-of-band edit would.
    pub fn delete_translation(&self, id: EntityId, locale: &Locale) -> bool {
        self.state()
            .rows
            .get_mut(&id)
            .map(|row| row.translations.remove(locale).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.state().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().rows.is_empty()
    }
}

#[async_trait]
impl TranslationStore for MemoryStore {
    async fn load(&self, id: EntityId) -> Result<Option<EntitySnapshot>, StoreError> {
        Ok(self.state().rows.get(&id).cloned())
    }

    async fn save(&self, entity: &TranslatedEntity) -> Result<EntitySnapshot, StoreError> {
        let mut state = self.state();

        let id = match entity.id() {
            Some(id) => {
                if !state.rows.contains_key(&id) {
                    return Err(StoreError::NotFound(id));
                }
                id
            }
            None => {
                state.next_id += 1;
                state.next_id
            }
        };

        // Only pending edits are written; rows removed elsewhere stay removed.
        let existing = state.rows.remove(&id).unwrap_or_default();
        let mut translations = existing.translations;
        for (locale, attributes) in entity.pending().iter().filter(|(_, a)| !a.is_empty()) {
            translations
                .entry(locale.clone())
                .or_default()
                .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let snapshot = EntitySnapshot {
            id,
            shared: entity.shared_attributes().clone(),
            translations,
        };
        state.rows.insert(id, snapshot.clone());
        Ok(snapshot)
    }

    async fn list_translations(&self, id: EntityId) -> Result<Vec<TranslationRow>, StoreError> {
        Ok(self
            .state()
            .rows
            .get(&id)
            .map(|row| {
                row.translations
                    .keys()
                    .map(|locale| TranslationRow {
                        locale: locale.clone(),
                        persisted: true,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_ids(&self) -> Result<Vec<EntityId>, StoreError> {
        Ok(self.state().rows.keys().copied().collect())
    }

    async fn delete(&self, id: EntityId) -> Result<(), StoreError> {
        match self.state().rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }
}
