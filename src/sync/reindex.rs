//! Bulk rebuild of every search document of one entity type.

use super::engine::{SyncEngine, WriteScope};
use super::report::{SyncReport, WriteAction};
use crate::entity::{EntityId, TranslatedEntity};
use crate::entity_type::EntityType;
use crate::error::SyncResult;
use crate::i18n::Locale;
use crate::search::SearchClient;
use crate::store::TranslationStore;
use crate::tracking::ExistenceTracker;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Write counts of one locale over a reindex run.
///
/// A flattened document write is counted under every locale it covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexStats {
    pub indexed: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl fmt::Display for ReindexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} indexed, {} deleted, {} failed",
            self.indexed, self.deleted, self.failed
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexSummary {
    pub entities: usize,
    pub per_locale: BTreeMap<Locale, ReindexStats>,
    /// Entities with at least one failed write, ascending.
    pub failed_entities: Vec<EntityId>,
}

impl ReindexSummary {
    pub fn is_success(&self) -> bool {
        self.failed_entities.is_empty()
    }

    pub fn stats(&self, locale: &Locale) -> ReindexStats {
        self.per_locale.get(locale).copied().unwrap_or_default()
    }

    fn record(&mut self, id: EntityId, report: &SyncReport) {
        self.entities += 1;
        for outcome in report.outcomes() {
            for locale in &outcome.locales {
                let stats = self.per_locale.entry(locale.clone()).or_default();
                match (&outcome.result, outcome.action) {
                    (Err(_), _) => stats.failed += 1,
                    (Ok(_), WriteAction::Delete) => stats.deleted += 1,
                    (Ok(_), _) => stats.indexed += 1,
                }
            }
        }
        if !report.is_success() {
            self.failed_entities.push(id);
        }
    }
}

pub struct Reindexer<S, C> {
    store: S,
    engine: SyncEngine<C>,
}

impl<S, C> Reindexer<S, C>
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

    pub fn engine(&self) -> &SyncEngine<C> {
        &self.engine
    }

    /// Rebuild documents for every record in the store.
    ///
    /// Search failures are counted and the run continues; store failures
    /// abort it.
    pub async fn run(&self, scope: &WriteScope) -> SyncResult<ReindexSummary> {
        let ty = self.engine.entity_type();
        let ids = self.store.list_ids().await?;
        info!(
            "{}: reindexing {} record(s) with {} strategy",
            ty.name(),
            ids.len(),
            ty.mapper().strategy_name()
        );

        let mut summary = ReindexSummary::default();
        for id in ids {
            let Some(snapshot) = self.store.load(id).await? else {
                debug!("{} {}: removed during reindex, skipping", ty.name(), id);
                continue;
            };
            let existence = ExistenceTracker::compute(&self.store, id).await?;
            let entity = TranslatedEntity::from_snapshot(&snapshot);

            let report = self.engine.import(id, &entity, &existence, scope).await;
            if !report.is_success() {
                warn!("{} {}: reindex incomplete: {}", ty.name(), id, report);
            }
            summary.record(id, &report);
        }

        for (locale, stats) in &summary.per_locale {
            info!("✓ {} [{}]: {}", ty.name(), locale, stats);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{PartitionMapper, SharedChangePolicy};
    use crate::search::{RecordingSearchClient, SearchError};
    use crate::store::MemoryStore;

    fn locale(code: &str) -> Locale {
        Locale::parse(code).unwrap()
    }

    fn partition_type() -> Arc<EntityType> {
        Arc::new(
            EntityType::builder("article")
                .translates(["title"])
                .locales(["en", "ja"])
                .partition(PartitionMapper::new(SharedChangePolicy::Ignore))
                .build()
                .unwrap(),
        )
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();

        let mut both = TranslatedEntity::new();
        both.set_translated(&locale("en"), "title", "Search engine");
        both.set_translated(&locale("ja"), "title", "検索エンジン");
        store.save(&both).await.unwrap();

        let mut english = TranslatedEntity::new();
        english.set_translated(&locale("en"), "title", "Index");
        store.save(&english).await.unwrap();

        store
    }

    #[tokio::test]
    async fn test_run_counts_per_locale() {
        let store = seeded_store().await;
        let client = RecordingSearchClient::new();
        let reindexer = Reindexer::new(partition_type(), store, client.clone());

        let summary = reindexer.run(&WriteScope::AllLocales).await.unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.entities, 2);
        assert_eq!(
            summary.stats(&locale("en")),
            ReindexStats {
                indexed: 2,
                deleted: 0,
                failed: 0
            }
        );
        assert_eq!(
            summary.stats(&locale("ja")),
            ReindexStats {
                indexed: 1,
                deleted: 1,
                failed: 0
            }
        );
        assert!(client.document("articles-ja", 1).is_some());
        assert!(client.document("articles-ja", 2).is_none());
    }

    #[tokio::test]
    async fn test_run_scoped_to_one_locale() {
        let store = seeded_store().await;
        let client = RecordingSearchClient::new();
        let reindexer = Reindexer::new(partition_type(), store, client.clone());

        let summary = reindexer
            .run(&WriteScope::Locale(locale("en")))
            .await
            .unwrap();

        assert_eq!(summary.stats(&locale("ja")), ReindexStats::default());
        assert!(client.writes().iter().all(|w| w.index() == "articles-en"));
    }

    #[tokio::test]
    async fn test_run_continues_after_failures() {
        let store = seeded_store().await;
        let client = RecordingSearchClient::new();
        client.fail_index(
            "articles-en",
            SearchError::Http {
                status: 503,
                body: String::new(),
            },
        );
        let reindexer = Reindexer::new(partition_type(), store, client.clone());

        let summary = reindexer.run(&WriteScope::AllLocales).await.unwrap();

        assert!(!summary.is_success());
        assert_eq!(summary.failed_entities, vec![1, 2]);
        assert_eq!(summary.stats(&locale("en")).failed, 2);
        assert_eq!(summary.stats(&locale("ja")).indexed, 1);
    }
}
