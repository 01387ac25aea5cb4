//! Search writes for one entity, planned per strategy and dispatched
//! concurrently.
//!
//! The engine never reads the relational store. Callers hand it the change
//! set and the existence map, in the order the save pipeline defines.

use super::report::{SyncReport, WriteAction, WriteOutcome, WriteStatus};
use crate::entity::{EntityId, TranslatedEntity};
use crate::entity_type::EntityType;
use crate::i18n::Locale;
use crate::mapping::{Document, FieldMapper, FlattenMapper, PartitionMapper, SharedChangePolicy};
use crate::search::SearchClient;
use crate::tracking::{ChangeSet, ExistenceMap};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which locales a write call may touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WriteScope {
    #[default]
    AllLocales,
    /// Only this locale, bypassing the multi-locale fan-out.
    Locale(Locale),
}

impl WriteScope {
    pub fn allows(&self, locale: &Locale) -> bool {
        match self {
            WriteScope::AllLocales => true,
            WriteScope::Locale(only) => only == locale,
        }
    }
}

enum Operation {
    Index(Document),
    /// Partial update. On a missing document, `fallback` is indexed in full;
    /// without a fallback the write counts as already applied.
    Update {
        partial: Document,
        fallback: Option<Document>,
    },
    Delete,
}

struct PlannedWrite {
    locales: Vec<Locale>,
    index: String,
    doc_type: String,
    operation: Operation,
}

impl PlannedWrite {
    fn flatten(mapper: &FlattenMapper, locales: Vec<Locale>, operation: Operation) -> Self {
        Self {
            locales,
            index: mapper.index_name().to_string(),
            doc_type: mapper.document_type().to_string(),
            operation,
        }
    }

    fn partition(mapper: &PartitionMapper, locale: &Locale, operation: Operation) -> Self {
        Self {
            locales: vec![locale.clone()],
            index: mapper.index_name(locale),
            doc_type: mapper.document_type(locale),
            operation,
        }
    }
}

fn describe(locales: &[Locale]) -> String {
    locales
        .iter()
        .map(Locale::code)
        .collect::<Vec<_>>()
        .join(",")
}

pub struct SyncEngine<C> {
    ty: Arc<EntityType>,
    client: C,
}

impl<C: SearchClient> SyncEngine<C> {
    pub fn new(ty: Arc<EntityType>, client: C) -> Self {
        Self { ty, client }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.ty
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// First save of an entity: one full index write per locale in the
    /// change set (flatten: a single write covering all of them).
    pub async fn index_created(
        &self,
        id: EntityId,
        entity: &TranslatedEntity,
        changes: &ChangeSet,
        scope: &WriteScope,
    ) -> SyncReport {
        let plan = match self.ty.mapper() {
            FieldMapper::Flatten(mapper) => {
                let locales = self.scoped(changes.locales(), scope);
                if locales.is_empty() {
                    Vec::new()
                } else {
                    let body = mapper.to_document(&self.ty, id, entity);
                    vec![PlannedWrite::flatten(mapper, locales, Operation::Index(body))]
                }
            }
            FieldMapper::Partition(mapper) => self
                .scoped(changes.locales(), scope)
                .iter()
                .map(|locale| {
                    let body = mapper.to_document(&self.ty, id, entity, locale);
                    PlannedWrite::partition(mapper, locale, Operation::Index(body))
                })
                .collect(),
        };
        self.dispatch(id, plan).await
    }

    /// Later save: partial updates where a document is known to exist, full
    /// index writes where it is not. Locales outside the change set are left
    /// alone, except for shared-change propagation under partition.
    pub async fn update(
        &self,
        id: EntityId,
        entity: &TranslatedEntity,
        changes: &ChangeSet,
        known: &ExistenceMap,
        scope: &WriteScope,
    ) -> SyncReport {
        let plan = match self.ty.mapper() {
            FieldMapper::Flatten(mapper) => {
                self.plan_flatten_update(mapper, id, entity, changes, known, scope)
            }
            FieldMapper::Partition(mapper) => {
                self.plan_partition_update(mapper, id, entity, changes, known, scope)
            }
        };
        self.dispatch(id, plan).await
    }

    fn plan_flatten_update(
        &self,
        mapper: &FlattenMapper,
        id: EntityId,
        entity: &TranslatedEntity,
        changes: &ChangeSet,
        known: &ExistenceMap,
        scope: &WriteScope,
    ) -> Vec<PlannedWrite> {
        let scoped = match scope {
            WriteScope::AllLocales => changes.clone(),
            WriteScope::Locale(locale) => changes.restrict_to(locale),
        };
        if scoped.is_empty() {
            return Vec::new();
        }

        let locales = self.scoped(scoped.locales(), scope);
        let body = mapper.to_document(&self.ty, id, entity);
        let operation = if known.any() {
            Operation::Update {
                partial: mapper.partial_document(&self.ty, &scoped),
                fallback: Some(body),
            }
        } else {
            Operation::Index(body)
        };
        vec![PlannedWrite::flatten(mapper, locales, operation)]
    }

    fn plan_partition_update(
        &self,
        mapper: &PartitionMapper,
        id: EntityId,
        entity: &TranslatedEntity,
        changes: &ChangeSet,
        known: &ExistenceMap,
        scope: &WriteScope,
    ) -> Vec<PlannedWrite> {
        let mut plan = Vec::new();

        for locale in self.scoped(changes.locales(), scope) {
            let Some(attributes) = changes.get(&locale) else {
                continue;
            };
            let body = mapper.to_document(&self.ty, id, entity, &locale);
            let operation = if known.exists(&locale) {
                Operation::Update {
                    partial: mapper.partial_document(&self.ty, attributes),
                    fallback: Some(body),
                }
            } else {
                Operation::Index(body)
            };
            plan.push(PlannedWrite::partition(mapper, &locale, operation));
        }

        if changes.common().is_empty() {
            return plan;
        }
        match mapper.shared_change_policy() {
            SharedChangePolicy::Ignore => {
                debug!(
                    "{} {}: shared changes not propagated to untouched locales",
                    self.ty.name(),
                    id
                );
            }
            SharedChangePolicy::PropagateToExisting => {
                let untouched = known
                    .locales()
                    .filter(|locale| self.ty.locales().contains(locale))
                    .filter(|locale| !changes.contains(locale));
                for locale in self.scoped(untouched, scope) {
                    let operation = Operation::Update {
                        partial: mapper.partial_document(&self.ty, changes.common()),
                        fallback: Some(mapper.to_document(&self.ty, id, entity, &locale)),
                    };
                    plan.push(PlannedWrite::partition(mapper, &locale, operation));
                }
            }
        }
        plan
    }

    /// Remove the documents of an entity whose record is being deleted.
    ///
    /// `existence` must be read from the store at deletion time. A flatten
    /// document restricted to one locale only has that locale's fields
    /// cleared.
    pub async fn delete(
        &self,
        id: EntityId,
        existence: &ExistenceMap,
        scope: &WriteScope,
    ) -> SyncReport {
        let locales = self.scoped(existence.locales(), scope);
        let plan = match self.ty.mapper() {
            FieldMapper::Flatten(_) if locales.is_empty() => Vec::new(),
            FieldMapper::Flatten(mapper) => {
                let operation = match scope {
                    WriteScope::AllLocales => Operation::Delete,
                    WriteScope::Locale(_) => Operation::Update {
                        partial: mapper.cleared_locales(&self.ty, &locales),
                        fallback: None,
                    },
                };
                vec![PlannedWrite::flatten(mapper, locales, operation)]
            }
            FieldMapper::Partition(mapper) => locales
                .iter()
                .map(|locale| PlannedWrite::partition(mapper, locale, Operation::Delete))
                .collect(),
        };
        self.dispatch(id, plan).await
    }

    /// Catch up with translations removed out of band.
    ///
    /// `vanished` are the locales that were known to exist and are gone from
    /// the store; `remaining` is the current existence map. Not scoped.
    pub async fn reconcile(
        &self,
        id: EntityId,
        vanished: &[Locale],
        remaining: &ExistenceMap,
    ) -> SyncReport {
        if vanished.is_empty() {
            return SyncReport::new();
        }
        let locales = self.scoped(vanished, &WriteScope::AllLocales);
        debug!(
            "{} {}: reconciling vanished locale(s) {}",
            self.ty.name(),
            id,
            describe(&locales)
        );

        let plan = match self.ty.mapper() {
            FieldMapper::Flatten(mapper) => {
                let operation = if remaining.any() {
                    Operation::Update {
                        partial: mapper.cleared_locales(&self.ty, &locales),
                        fallback: None,
                    }
                } else {
                    Operation::Delete
                };
                vec![PlannedWrite::flatten(mapper, locales, operation)]
            }
            FieldMapper::Partition(mapper) => locales
                .iter()
                .map(|locale| PlannedWrite::partition(mapper, locale, Operation::Delete))
                .collect(),
        };
        self.dispatch(id, plan).await
    }

    /// Rebuild the documents of one committed entity from scratch.
    ///
    /// Locales with a persisted translation are indexed in full, the others
    /// are deleted.
    pub async fn import(
        &self,
        id: EntityId,
        entity: &TranslatedEntity,
        existence: &ExistenceMap,
        scope: &WriteScope,
    ) -> SyncReport {
        let plan = match self.ty.mapper() {
            FieldMapper::Flatten(mapper) => {
                let (locales, operation) = if existence.any() {
                    (
                        self.scoped(existence.locales(), scope),
                        Operation::Index(mapper.to_document(&self.ty, id, entity)),
                    )
                } else {
                    (self.scoped(self.ty.locales().iter(), scope), Operation::Delete)
                };
                if locales.is_empty() {
                    Vec::new()
                } else {
                    vec![PlannedWrite::flatten(mapper, locales, operation)]
                }
            }
            FieldMapper::Partition(mapper) => self
                .scoped(self.ty.locales().iter(), scope)
                .iter()
                .map(|locale| {
                    let operation = if existence.exists(locale) {
                        Operation::Index(mapper.to_document(&self.ty, id, entity, locale))
                    } else {
                        Operation::Delete
                    };
                    PlannedWrite::partition(mapper, locale, operation)
                })
                .collect(),
        };
        self.dispatch(id, plan).await
    }

    /// Create the search indices of this entity type with their mappings.
    pub async fn create_indices(&self, scope: &WriteScope) -> SyncReport {
        let locales = self.scoped(self.ty.locales().iter(), scope);
        let targets: Vec<(Vec<Locale>, String, serde_json::Value)> = match self.ty.mapper() {
            FieldMapper::Flatten(_) if locales.is_empty() => Vec::new(),
            FieldMapper::Flatten(mapper) => {
                vec![(locales, mapper.index_name().to_string(), mapper.mapping())]
            }
            FieldMapper::Partition(mapper) => locales
                .into_iter()
                .map(|locale| {
                    let index = mapper.index_name(&locale);
                    let body = mapper.mapping_for(&locale);
                    (vec![locale], index, body)
                })
                .collect(),
        };

        let outcomes = join_all(targets.into_iter().map(|(locales, index, body)| async move {
            let result = self.client.create_index(&index, &body).await;
            match &result {
                Ok(()) => debug!("{}: created index {}", self.ty.name(), index),
                Err(e) => warn!("{}: failed to create index {}: {}", self.ty.name(), index, e),
            }
            WriteOutcome {
                locales,
                action: WriteAction::CreateIndex,
                index,
                result: result.map(|()| WriteStatus::Written),
            }
        }))
        .await;
        SyncReport::from_outcomes(outcomes)
    }

    /// Locales allowed by `scope`, in registry order. Locales outside the
    /// registry sort last.
    fn scoped<'a>(
        &self,
        locales: impl IntoIterator<Item = &'a Locale>,
        scope: &WriteScope,
    ) -> Vec<Locale> {
        let mut selected: Vec<Locale> = locales
            .into_iter()
            .filter(|locale| scope.allows(locale))
            .cloned()
            .collect();
        selected.sort_by_key(|locale| {
            self.ty
                .locales()
                .iter()
                .position(|registered| registered == locale)
                .unwrap_or(usize::MAX)
        });
        selected
    }

    async fn dispatch(&self, id: EntityId, plan: Vec<PlannedWrite>) -> SyncReport {
        let outcomes = join_all(plan.into_iter().map(|write| self.execute(id, write))).await;
        SyncReport::from_outcomes(outcomes)
    }

    async fn execute(&self, id: EntityId, write: PlannedWrite) -> WriteOutcome {
        let PlannedWrite {
            locales,
            index,
            doc_type,
            operation,
        } = write;

        let (action, result) = match operation {
            Operation::Index(body) => (
                WriteAction::Index,
                self.client
                    .index_document(&index, &doc_type, id, &body)
                    .await
                    .map(|()| WriteStatus::Written),
            ),
            Operation::Update { partial, fallback } => {
                match self
                    .client
                    .update_document(&index, &doc_type, id, &partial)
                    .await
                {
                    Ok(()) => (WriteAction::Update, Ok(WriteStatus::Written)),
                    Err(e) if e.is_not_found() => match fallback {
                        Some(body) => {
                            warn!(
                                "{} {}: document missing in {} ({}), indexing in full",
                                self.ty.name(),
                                id,
                                index,
                                describe(&locales)
                            );
                            (
                                WriteAction::IndexAfterMissingDocument,
                                self.client
                                    .index_document(&index, &doc_type, id, &body)
                                    .await
                                    .map(|()| WriteStatus::Written),
                            )
                        }
                        None => (WriteAction::Update, Ok(WriteStatus::AlreadyAbsent)),
                    },
                    Err(e) => (WriteAction::Update, Err(e)),
                }
            }
            Operation::Delete => match self.client.delete_document(&index, &doc_type, id).await {
                Ok(()) => (WriteAction::Delete, Ok(WriteStatus::Written)),
                Err(e) if e.is_not_found() => (WriteAction::Delete, Ok(WriteStatus::AlreadyAbsent)),
                Err(e) => (WriteAction::Delete, Err(e)),
            },
        };

        match &result {
            Ok(status) => debug!(
                "{} {}: {} {} [{}] -> {:?}",
                self.ty.name(),
                id,
                action,
                index,
                describe(&locales),
                status
            ),
            Err(e) => warn!(
                "{} {}: {} {} [{}] failed: {}",
                self.ty.name(),
                id,
                action,
                index,
                describe(&locales),
                e
            ),
        }

        WriteOutcome {
            locales,
            action,
            index,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Attributes, EntitySnapshot};
    use crate::search::{RecordingSearchClient, SearchError, SearchWrite};
    use crate::tracking::ChangeTracker;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn locale(code: &str) -> Locale {
        Locale::parse(code).unwrap()
    }

    fn flatten_type() -> Arc<EntityType> {
        Arc::new(
            EntityType::builder("article")
                .translates(["title", "body"])
                .shared(["code"])
                .locales(["en", "ja"])
                .build()
                .unwrap(),
        )
    }

    fn partition_type(policy: SharedChangePolicy) -> Arc<EntityType> {
        Arc::new(
            EntityType::builder("article")
                .translates(["title", "body"])
                .shared(["code"])
                .locales(["en", "ja"])
                .partition(PartitionMapper::new(policy).with_mapping(|locale| {
                    json!({ "settings": { "analyzer": locale.code() } })
                }))
                .build()
                .unwrap(),
        )
    }

    fn engine(ty: Arc<EntityType>) -> (SyncEngine<RecordingSearchClient>, RecordingSearchClient) {
        let client = RecordingSearchClient::new();
        (SyncEngine::new(ty, client.clone()), client)
    }

    /// Committed entity with an English and a Japanese title.
    fn committed() -> EntitySnapshot {
        EntitySnapshot {
            id: 1,
            shared: Attributes::from([("code".to_string(), json!("A-1"))]),
            translations: BTreeMap::from([
                (
                    locale("en"),
                    Attributes::from([("title".to_string(), json!("Search engine"))]),
                ),
                (
                    locale("ja"),
                    Attributes::from([("title".to_string(), json!("検索エンジン"))]),
                ),
            ]),
        }
    }

    fn known(codes: &[&str]) -> ExistenceMap {
        codes.iter().map(|code| locale(code)).collect()
    }

    fn keys(document: &Document) -> Vec<&str> {
        document.keys().map(String::as_str).collect()
    }

    // ==================== index_created Tests ====================

    #[tokio::test]
    async fn test_flatten_created_is_one_full_index() {
        let ty = flatten_type();
        let (engine, client) = engine(ty.clone());
        let mut entity = TranslatedEntity::new();
        entity.set_shared("code", "A-1");
        entity.set_translated(&locale("en"), "title", "Search engine");
        entity.set_translated(&locale("ja"), "title", "検索エンジン");
        let changes = ChangeTracker::compute(&ty, &entity, None);

        let report = engine
            .index_created(1, &entity, &changes, &WriteScope::AllLocales)
            .await;

        assert!(report.is_success());
        assert_eq!(report.write_count(), 1);
        assert_eq!(report.outcomes()[0].locales, vec![locale("en"), locale("ja")]);
        let document = client.document("articles", 1).expect("Should be indexed");
        assert_eq!(
            keys(&document),
            vec!["body_en", "body_ja", "code", "id", "title_en", "title_ja"]
        );
        assert_eq!(document["title_ja"], json!("検索エンジン"));
        assert_eq!(document["body_en"], Value::Null);
    }

    #[tokio::test]
    async fn test_partition_created_writes_touched_locales_only() {
        let ty = partition_type(SharedChangePolicy::Ignore);
        let (engine, client) = engine(ty.clone());
        let mut entity = TranslatedEntity::new();
        entity.set_translated(&locale("ja"), "title", "検索エンジン");
        let changes = ChangeTracker::compute(&ty, &entity, None);

        let report = engine
            .index_created(1, &entity, &changes, &WriteScope::AllLocales)
            .await;

        assert_eq!(report.write_count(), 1);
        let writes = client.writes();
        match &writes[0] {
            SearchWrite::Index {
                index,
                doc_type,
                body,
                ..
            } => {
                assert_eq!(index, "articles-ja");
                assert_eq!(doc_type, "article-ja");
                assert_eq!(keys(body), vec!["body", "code", "id", "title"]);
                assert_eq!(body["title"], json!("検索エンジン"));
            }
            other => panic!("Expected index write, got {:?}", other),
        }
    }

    // ==================== update Tests ====================

    #[tokio::test]
    async fn test_flatten_update_sends_changed_fields_only() {
        let ty = flatten_type();
        let (engine, client) = engine(ty.clone());
        let snapshot = committed();
        client.seed_document("articles", 1, Document::new());
        let mut entity = TranslatedEntity::from_snapshot(&snapshot);
        entity.set_translated(&locale("en"), "title", "Search engines");
        let changes = ChangeTracker::compute(&ty, &entity, Some(&snapshot));

        let report = engine
            .update(1, &entity, &changes, &known(&["en", "ja"]), &WriteScope::AllLocales)
            .await;

        assert_eq!(report.outcomes()[0].action, WriteAction::Update);
        assert_eq!(
            client.writes()[0],
            SearchWrite::Update {
                index: "articles".to_string(),
                doc_type: "article".to_string(),
                id: 1,
                partial: [("title_en".to_string(), json!("Search engines"))]
                    .into_iter()
                    .collect(),
            }
        );
    }

    #[tokio::test]
    async fn test_partition_update_unknown_locale_is_indexed() {
        let ty = partition_type(SharedChangePolicy::Ignore);
        let (engine, client) = engine(ty.clone());
        let mut snapshot = committed();
        snapshot.translations.remove(&locale("ja"));
        client.seed_document("articles-en", 1, Document::new());
        let mut entity = TranslatedEntity::from_snapshot(&snapshot);
        entity.set_translated(&locale("en"), "title", "Search engines");
        entity.set_translated(&locale("ja"), "title", "検索エンジン");
        let changes = ChangeTracker::compute(&ty, &entity, Some(&snapshot));

        let report = engine
            .update(1, &entity, &changes, &known(&["en"]), &WriteScope::AllLocales)
            .await;

        let actions: Vec<_> = report.outcomes().iter().map(|o| o.action).collect();
        assert_eq!(actions, vec![WriteAction::Update, WriteAction::Index]);
        assert_eq!(report.outcomes()[1].index, "articles-ja");
    }

    #[tokio::test]
    async fn test_update_missing_document_falls_back_to_index() {
        let ty = partition_type(SharedChangePolicy::Ignore);
        let (engine, client) = engine(ty.clone());
        let snapshot = committed();
        let mut entity = TranslatedEntity::from_snapshot(&snapshot);
        entity.set_translated(&locale("en"), "title", "Search engines");
        let changes = ChangeTracker::compute(&ty, &entity, Some(&snapshot));

        let report = engine
            .update(1, &entity, &changes, &known(&["en", "ja"]), &WriteScope::AllLocales)
            .await;

        assert!(report.is_success());
        assert_eq!(
            report.outcomes()[0].action,
            WriteAction::IndexAfterMissingDocument
        );
        let document = client.document("articles-en", 1).expect("Should be indexed");
        assert_eq!(document["title"], json!("Search engines"));
        assert_eq!(document["code"], json!("A-1"));
    }

    #[tokio::test]
    async fn test_partition_shared_only_change_ignored() {
        let ty = partition_type(SharedChangePolicy::Ignore);
        let (engine, client) = engine(ty.clone());
        let snapshot = committed();
        let mut entity = TranslatedEntity::from_snapshot(&snapshot);
        entity.set_shared("code", "A-2");
        let changes = ChangeTracker::compute(&ty, &entity, Some(&snapshot));

        let report = engine
            .update(1, &entity, &changes, &known(&["en", "ja"]), &WriteScope::AllLocales)
            .await;

        assert!(report.is_empty());
        assert!(client.writes().is_empty());
    }

    #[tokio::test]
    async fn test_partition_shared_only_change_propagated() {
        let ty = partition_type(SharedChangePolicy::PropagateToExisting);
        let (engine, client) = engine(ty.clone());
        let snapshot = committed();
        client.seed_document("articles-en", 1, Document::new());
        client.seed_document("articles-ja", 1, Document::new());
        let mut entity = TranslatedEntity::from_snapshot(&snapshot);
        entity.set_shared("code", "A-2");
        let changes = ChangeTracker::compute(&ty, &entity, Some(&snapshot));

        let report = engine
            .update(1, &entity, &changes, &known(&["en", "ja"]), &WriteScope::AllLocales)
            .await;

        assert_eq!(report.write_count(), 2);
        let expected: Document = [("code".to_string(), json!("A-2"))].into_iter().collect();
        for write in client.writes() {
            match write {
                SearchWrite::Update { partial, .. } => assert_eq!(partial, expected),
                other => panic!("Expected update, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_scope_restricts_fan_out() {
        let ty = partition_type(SharedChangePolicy::Ignore);
        let (engine, client) = engine(ty.clone());
        let mut entity = TranslatedEntity::new();
        entity.set_translated(&locale("en"), "title", "Search engine");
        entity.set_translated(&locale("ja"), "title", "検索エンジン");
        let changes = ChangeTracker::compute(&ty, &entity, None);

        let report = engine
            .index_created(1, &entity, &changes, &WriteScope::Locale(locale("ja")))
            .await;

        assert_eq!(report.write_count(), 1);
        assert_eq!(client.writes()[0].index(), "articles-ja");
    }

    #[tokio::test]
    async fn test_failure_in_one_locale_does_not_block_another() {
        let ty = partition_type(SharedChangePolicy::Ignore);
        let (engine, client) = engine(ty.clone());
        client.fail_index("articles-en", SearchError::Transport("reset".to_string()));
        let mut entity = TranslatedEntity::new();
        entity.set_translated(&locale("en"), "title", "Search engine");
        entity.set_translated(&locale("ja"), "title", "検索エンジン");
        let changes = ChangeTracker::compute(&ty, &entity, None);

        let report = engine
            .index_created(1, &entity, &changes, &WriteScope::AllLocales)
            .await;

        assert!(!report.is_success());
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].locales, vec![locale("en")]);
        assert!(client.document("articles-ja", 1).is_some());
    }

    // ==================== delete / reconcile Tests ====================

    #[tokio::test]
    async fn test_partition_delete_missing_document_is_already_absent() {
        let ty = partition_type(SharedChangePolicy::Ignore);
        let (engine, client) = engine(ty);
        client.seed_document("articles-en", 1, Document::new());

        let report = engine
            .delete(1, &known(&["en", "ja"]), &WriteScope::AllLocales)
            .await;

        assert!(report.is_success());
        let statuses: Vec<_> = report
            .outcomes()
            .iter()
            .map(|o| o.result.clone().unwrap())
            .collect();
        assert_eq!(statuses, vec![WriteStatus::Written, WriteStatus::AlreadyAbsent]);
    }

    #[tokio::test]
    async fn test_flatten_delete_without_translations_is_noop() {
        let (engine, client) = engine(flatten_type());
        let report = engine
            .delete(1, &ExistenceMap::default(), &WriteScope::AllLocales)
            .await;
        assert!(report.is_empty());
        assert!(client.writes().is_empty());
    }

    #[tokio::test]
    async fn test_flatten_reconcile_clears_vanished_fields() {
        let (engine, client) = engine(flatten_type());
        client.seed_document(
            "articles",
            1,
            [
                ("title_en".to_string(), json!("Search engine")),
                ("title_ja".to_string(), json!("検索エンジン")),
            ]
            .into_iter()
            .collect(),
        );

        let report = engine.reconcile(1, &[locale("ja")], &known(&["en"])).await;

        assert!(report.is_success());
        let document = client.document("articles", 1).unwrap();
        assert_eq!(document["title_ja"], Value::Null);
        assert_eq!(document["body_ja"], Value::Null);
        assert_eq!(document["title_en"], json!("Search engine"));
    }

    #[tokio::test]
    async fn test_flatten_reconcile_last_locale_deletes() {
        let (engine, client) = engine(flatten_type());
        client.seed_document("articles", 1, Document::new());

        let report = engine
            .reconcile(1, &[locale("en")], &ExistenceMap::default())
            .await;

        assert_eq!(report.outcomes()[0].action, WriteAction::Delete);
        assert!(client.document("articles", 1).is_none());
    }

    // ==================== import / create_indices Tests ====================

    #[tokio::test]
    async fn test_partition_import_deletes_missing_locales() {
        let ty = partition_type(SharedChangePolicy::Ignore);
        let (engine, client) = engine(ty);
        let mut snapshot = committed();
        snapshot.translations.remove(&locale("ja"));
        client.seed_document("articles-ja", 1, Document::new());
        let entity = TranslatedEntity::from_snapshot(&snapshot);

        let report = engine
            .import(1, &entity, &known(&["en"]), &WriteScope::AllLocales)
            .await;

        let actions: Vec<_> = report.outcomes().iter().map(|o| o.action).collect();
        assert_eq!(actions, vec![WriteAction::Index, WriteAction::Delete]);
        assert!(client.document("articles-en", 1).is_some());
        assert!(client.document("articles-ja", 1).is_none());
    }

    #[tokio::test]
    async fn test_create_indices_per_locale_mapping() {
        let ty = partition_type(SharedChangePolicy::Ignore);
        let (engine, client) = engine(ty);

        let report = engine.create_indices(&WriteScope::AllLocales).await;

        assert_eq!(report.write_count(), 2);
        assert_eq!(
            client.index_body("articles-ja"),
            Some(json!({ "settings": { "analyzer": "ja" } }))
        );
        assert_eq!(
            client.index_body("articles-en"),
            Some(json!({ "settings": { "analyzer": "en" } }))
        );
    }

    #[tokio::test]
    async fn test_flatten_create_indices_single_index() {
        let (engine, client) = engine(flatten_type());
        let report = engine.create_indices(&WriteScope::AllLocales).await;

        assert_eq!(report.write_count(), 1);
        assert_eq!(client.index_body("articles"), Some(json!({})));
    }
}
