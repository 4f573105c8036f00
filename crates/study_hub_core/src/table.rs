//! crates/study_hub_core/src/table.rs
//!
//! Capacity bounds shared by every `Table` backend, and the in-memory backend
//! used by tests and by deployments without a database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::Entity;
use crate::ports::{PortError, PortResult, Table, TableId};

//=========================================================================================
// Bounds
//=========================================================================================

/// Maximum sizes, in bytes, of a key and of a JSON-encoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableBounds {
    pub max_key_size: usize,
    pub max_value_size: usize,
}

impl Default for TableBounds {
    fn default() -> Self {
        Self {
            max_key_size: 44,
            max_value_size: 1024,
        }
    }
}

impl TableBounds {
    /// Encodes `value` and checks both sizes. Returns the encoding so that
    /// backends storing JSON don't serialize twice.
    pub fn check<V: Entity>(&self, table: TableId, key: &str, value: &V) -> PortResult<Vec<u8>> {
        if key.len() > self.max_key_size {
            return Err(PortError::store_write::<V>(
                "put",
                table,
                key,
                format!(
                    "capacity exceeded: key is {} bytes, limit is {}",
                    key.len(),
                    self.max_key_size
                ),
            ));
        }
        let encoded = serde_json::to_vec(value)
            .map_err(|e| PortError::store_write::<V>("put", table, key, e.to_string()))?;
        if encoded.len() > self.max_value_size {
            return Err(PortError::store_write::<V>(
                "put",
                table,
                key,
                format!(
                    "capacity exceeded: value is {} bytes, limit is {}",
                    encoded.len(),
                    self.max_value_size
                ),
            ));
        }
        Ok(encoded)
    }
}

//=========================================================================================
// In-Memory Table
//=========================================================================================

/// A `Table` backed by a `BTreeMap`. Lives as long as the process.
pub struct MemoryTable<V> {
    id: TableId,
    bounds: TableBounds,
    records: RwLock<BTreeMap<String, V>>,
}

impl<V: Entity> MemoryTable<V> {
    /// Creates an empty table in the namespace of `V`'s kind.
    pub fn new(bounds: TableBounds) -> Self {
        Self {
            id: TableId::for_kind(V::KIND),
            bounds,
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl<V: Entity> Table<V> for MemoryTable<V> {
    fn id(&self) -> TableId {
        self.id
    }

    async fn put(&self, key: &str, value: V) -> PortResult<()> {
        self.bounds.check(self.id, key, &value)?;
        self.records.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> PortResult<Option<V>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn values(&self) -> PortResult<Vec<V>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
