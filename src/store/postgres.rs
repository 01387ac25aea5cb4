use super::{TranslationRow, TranslationStore};
use crate::entity::{Attributes, EntityId, EntitySnapshot, TranslatedEntity};
use crate::error::StoreError;
use crate::i18n::Locale;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info};

fn table_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("table pattern is valid"))
}

/// PostgreSQL store with a record table and a `{table}_translations` table.
///
/// Shared attributes live in the record's `attributes` JSONB column; each
/// translation row holds one locale's attributes.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    table: String,
    translations_table: String,
}

impl PgStore {
    pub fn new(pool: PgPool, table: &str) -> Result<Self, StoreError> {
        if !table_pattern().is_match(table) {
            return Err(StoreError::InvalidTable(table.to_string()));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
            translations_table: format!("{}_translations", table),
        })
    }

    /// Connect to existing tables. Call [`PgStore::migrate`] to create them.
    pub async fn connect(database_url: &str, table: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Self::new(pool, table)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                attributes JSONB NOT NULL DEFAULT '{{}}',
                updated_at TIMESTAMPTZ NOT NULL
            )",
            self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                entity_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                locale TEXT NOT NULL,
                attributes JSONB NOT NULL DEFAULT '{{}}',
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (entity_id, locale)
            )",
            self.translations_table, self.table
        ))
        .execute(&self.pool)
        .await?;

        info!("✓ Tables {} and {} ready", self.table, self.translations_table);
        Ok(())
    }

    /// Delete one translation row, leaving the record in place.
    pub async fn delete_translation(
        &self,
        id: EntityId,
        locale: &Locale,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE entity_id = $1 AND locale = $2",
            self.translations_table
        ))
        .bind(id)
        .bind(locale.code())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn load_in(
        &self,
        conn: &mut PgConnection,
        id: EntityId,
    ) -> Result<Option<EntitySnapshot>, StoreError> {
        let row = sqlx::query(&format!("SELECT attributes FROM {} WHERE id = $1", self.table))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let Json(shared): Json<Attributes> = row.try_get("attributes")?;

        let rows = sqlx::query(&format!(
            "SELECT locale, attributes FROM {} WHERE entity_id = $1 ORDER BY locale",
            self.translations_table
        ))
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let mut translations = BTreeMap::new();
        for row in rows {
            let code: String = row.try_get("locale")?;
            let locale = Locale::parse(&code)
                .map_err(|e| StoreError::Corrupt(format!("entity {}: {}", id, e)))?;
            let Json(attributes): Json<Attributes> = row.try_get("attributes")?;
            translations.insert(locale, attributes);
        }

        Ok(Some(EntitySnapshot {
            id,
            shared,
            translations,
        }))
    }
}

#[async_trait]
impl TranslationStore for PgStore {
    async fn load(&self, id: EntityId) -> Result<Option<EntitySnapshot>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        self.load_in(&mut conn, id).await
    }

    async fn save(&self, entity: &TranslatedEntity) -> Result<EntitySnapshot, StoreError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let id: EntityId = match entity.id() {
            Some(id) => {
                let result = sqlx::query(&format!(
                    "UPDATE {} SET attributes = $1, updated_at = $2 WHERE id = $3",
                    self.table
                ))
                .bind(Json(entity.shared_attributes()))
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::NotFound(id));
                }
                id
            }
            None => {
                sqlx::query_scalar(&format!(
                    "INSERT INTO {} (attributes, updated_at) VALUES ($1, $2) RETURNING id",
                    self.table
                ))
                .bind(Json(entity.shared_attributes()))
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        for (locale, attributes) in entity.pending().iter().filter(|(_, a)| !a.is_empty()) {
            sqlx::query(&format!(
                "INSERT INTO {t} (entity_id, locale, attributes, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $4)
                 ON CONFLICT (entity_id, locale) DO UPDATE
                 SET attributes = {t}.attributes || EXCLUDED.attributes,
                     updated_at = EXCLUDED.updated_at",
                t = self.translations_table
            ))
            .bind(id)
            .bind(locale.code())
            .bind(Json(attributes))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let snapshot = self
            .load_in(&mut tx, id)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        tx.commit().await?;

        debug!(
            "Saved {} {} with {} translation(s)",
            self.table,
            id,
            snapshot.translations.len()
        );
        Ok(snapshot)
    }

    async fn list_translations(&self, id: EntityId) -> Result<Vec<TranslationRow>, StoreError> {
        let codes: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT locale FROM {} WHERE entity_id = $1 ORDER BY locale",
            self.translations_table
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        codes
            .iter()
            .map(|code| {
                Locale::parse(code)
                    .map(|locale| TranslationRow {
                        locale,
                        persisted: true,
                    })
                    .map_err(|e| StoreError::Corrupt(format!("entity {}: {}", id, e)))
            })
            .collect()
    }

    async fn list_ids(&self) -> Result<Vec<EntityId>, StoreError> {
        let ids = sqlx::query_scalar(&format!("SELECT id FROM {} ORDER BY id", self.table))
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn delete(&self, id: EntityId) -> Result<(), StoreError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
