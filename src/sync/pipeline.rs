//! Save pipeline: relational commit first, search writes after.
//!
//! Order per save:
//! 1. diff the entity against the snapshot it was loaded from
//! 2. read the translation rows, then commit to the store
//! 3. re-read the translation rows
//! 4. dispatch index/update writes against the rows read right before the
//!    commit
//! 5. reconcile rows that disappeared out of band

use super::engine::{SyncEngine, WriteScope};
use super::report::SyncReport;
use crate::entity::{EntityId, EntitySnapshot, TranslatedEntity};
use crate::entity_type::EntityType;
use crate::error::SyncResult;
use crate::search::SearchClient;
use crate::store::TranslationStore;
use crate::tracking::{ChangeTracker, ExistenceMap, ExistenceTracker};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An entity plus what the pipeline last observed about it.
#[derive(Debug, Clone, Default)]
pub struct Record {
    entity: TranslatedEntity,
    snapshot: Option<EntitySnapshot>,
    /// Translation rows read after the last load or save; `None` until the
    /// record has been committed once.
    known: Option<ExistenceMap>,
}

impl Record {
    /// A record that has never been saved.
    pub fn new(entity: TranslatedEntity) -> Self {
        Self {
            entity,
            snapshot: None,
            known: None,
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.entity.id()
    }

    pub fn entity(&self) -> &TranslatedEntity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut TranslatedEntity {
        &mut self.entity
    }

    pub fn snapshot(&self) -> Option<&EntitySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn known_locales(&self) -> Option<&ExistenceMap> {
        self.known.as_ref()
    }
}

pub struct SyncPipeline<S, C> {
    store: S,
    engine: SyncEngine<C>,
}

impl<S, C> SyncPipeline<S, C>
where
    S: TranslationStore,
    C: SearchClient,
{
    pub fn new(ty: Arc<EntityType>, store: S, client: C) -> Self {
        Self {
            store,
            engine: SyncEngine::new(ty, client),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &SyncEngine<C> {
        &self.engine
    }

    /// Load a committed record and read its translation rows.
    pub async fn load(&self, id: EntityId) -> SyncResult<Option<Record>> {
        let Some(snapshot) = self.store.load(id).await? else {
            return Ok(None);
        };
        let known = ExistenceTracker::compute(&self.store, id).await?;

        Ok(Some(Record {
            entity: TranslatedEntity::from_snapshot(&snapshot),
            snapshot: Some(snapshot),
            known: Some(known),
        }))
    }

    pub async fn save(&self, record: &mut Record) -> SyncResult<SyncReport> {
        self.save_with(record, &WriteScope::AllLocales).await
    }

    /// Commit the record, then write the affected search documents.
    ///
    /// Store failures abort with an error and leave the record untouched.
    /// Search failures never do: they are returned in the report, and the
    /// record reflects the commit either way.
    pub async fn save_with(
        &self,
        record: &mut Record,
        scope: &WriteScope,
    ) -> SyncResult<SyncReport> {
        let ty = self.engine.entity_type();
        let changes = ChangeTracker::compute(ty, &record.entity, record.snapshot.as_ref());

        // Rows may have changed out of band since the last read.
        let current = match record.id() {
            Some(id) => Some(ExistenceTracker::compute(&self.store, id).await?),
            None => None,
        };

        let snapshot = self.store.save(&record.entity).await?;
        let id = snapshot.id;
        let fresh = ExistenceTracker::compute(&self.store, id).await?;
        let committed = TranslatedEntity::from_snapshot(&snapshot);

        let mut report = match &current {
            None => {
                debug!("{} {}: created", ty.name(), id);
                self.engine
                    .index_created(id, &committed, &changes, scope)
                    .await
            }
            Some(current) => {
                if let Some(known) = &record.known {
                    if current != known {
                        warn!(
                            "{} {}: translation rows changed since last read",
                            ty.name(),
                            id
                        );
                    }
                }
                self.engine
                    .update(id, &committed, &changes, current, scope)
                    .await
            }
        };

        if let Some(known) = &record.known {
            let vanished = fresh.vanished_since(known);
            if !vanished.is_empty() {
                info!(
                    "{} {}: {} translation(s) removed out of band",
                    ty.name(),
                    id,
                    vanished.len()
                );
                report.merge(self.engine.reconcile(id, &vanished, &fresh).await);
            }
        }

        if !report.is_success() {
            warn!("{} {}: save synced with failures: {}", ty.name(), id, report);
        }

        record.entity = committed;
        record.snapshot = Some(snapshot);
        record.known = Some(fresh);
        Ok(report)
    }

    /// Delete the record and every search document it owns.
    ///
    /// Translation rows are re-read right before the delete; rows that were
    /// known earlier but vanished since are included.
    pub async fn destroy(&self, record: Record) -> SyncResult<SyncReport> {
        let Some(id) = record.id() else {
            return Ok(SyncReport::new());
        };

        let current = ExistenceTracker::compute(&self.store, id).await?;
        let owned = match &record.known {
            Some(known) => current.union(known),
            None => current,
        };

        self.store.delete(id).await?;
        let report = self.engine.delete(id, &owned, &WriteScope::AllLocales).await;
        debug!(
            "{} {}: destroyed, {}",
            self.engine.entity_type().name(),
            id,
            report
        );
        Ok(report)
    }
}
