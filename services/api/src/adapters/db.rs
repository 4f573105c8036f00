//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the durable implementation of the
//! `Table` port from the `core` crate. All four tables share one PostgreSQL
//! relation, `kv_records`, and are kept apart by their namespace id.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use study_hub_core::domain::{Course, Entity, Flashcard, Quiz, User};
use study_hub_core::ports::{PortError, PortResult, Table, TableId};
use study_hub_core::service::Tables;
use study_hub_core::table::TableBounds;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Owns the connection pool and hands out one `PgTable` per entity kind.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    bounds: TableBounds,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool, bounds: TableBounds) -> Self {
        Self { pool, bounds }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// The table holding records of kind `V`.
    pub fn table<V: Entity + DeserializeOwned>(&self) -> PgTable<V> {
        PgTable {
            pool: self.pool.clone(),
            id: TableId::for_kind(V::KIND),
            bounds: self.bounds,
            _marker: PhantomData,
        }
    }

    /// All four tables, ready to hand to the lifecycle manager.
    pub fn tables(&self) -> Tables {
        Tables {
            courses: Arc::new(self.table::<Course>()),
            flashcards: Arc::new(self.table::<Flashcard>()),
            quizzes: Arc::new(self.table::<Quiz>()),
            users: Arc::new(self.table::<User>()),
        }
    }
}

/// One namespace of `kv_records`.
pub struct PgTable<V> {
    pool: PgPool,
    id: TableId,
    bounds: TableBounds,
    _marker: PhantomData<fn() -> V>,
}

impl<V: Entity> PgTable<V> {
    fn namespace(&self) -> i16 {
        i16::from(self.id.0)
    }

    fn write_error(&self, operation: &'static str, key: &str, e: sqlx::Error) -> PortError {
        PortError::store_write::<V>(operation, self.id, key, e.to_string())
    }
}

//=========================================================================================
// "Impure" Database Record Struct
//=========================================================================================

#[derive(FromRow)]
struct KvRecord {
    key: String,
    value: Json<serde_json::Value>,
}

impl KvRecord {
    fn to_domain<V: DeserializeOwned>(self, table: TableId) -> PortResult<V> {
        serde_json::from_value(self.value.0).map_err(|e| {
            PortError::Unexpected(format!(
                "Record {} in table {} could not be decoded: {}",
                self.key, table, e
            ))
        })
    }
}

//=========================================================================================
// `Table` Trait Implementation
//=========================================================================================

#[async_trait]
impl<V> Table<V> for PgTable<V>
where
    V: Entity + DeserializeOwned,
{
    fn id(&self) -> TableId {
        self.id
    }

    async fn put(&self, key: &str, value: V) -> PortResult<()> {
        let encoded = self.bounds.check(self.id, key, &value)?;
        let encoded = String::from_utf8(encoded)
            .map_err(|e| PortError::store_write::<V>("put", self.id, key, e.to_string()))?;
        sqlx::query(
            "INSERT INTO kv_records (namespace, key, value) VALUES ($1, $2, $3::jsonb) \
             ON CONFLICT (namespace, key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(self.namespace())
        .bind(key)
        .bind(encoded)
        .execute(&self.pool)
        .await
        .map_err(|e| self.write_error("put", key, e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> PortResult<Option<V>> {
        let record = sqlx::query_as::<_, KvRecord>(
            "SELECT key, value FROM kv_records WHERE namespace = $1 AND key = $2",
        )
        .bind(self.namespace())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.map(|r| r.to_domain(self.id)).transpose()
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM kv_records WHERE namespace = $1 AND key = $2")
            .bind(self.namespace())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| self.write_error("remove", key, e))?;
        Ok(())
    }

    async fn values(&self) -> PortResult<Vec<V>> {
        let records = sqlx::query_as::<_, KvRecord>(
            "SELECT key, value FROM kv_records WHERE namespace = $1",
        )
        .bind(self.namespace())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain(self.id)).collect()
    }
}
