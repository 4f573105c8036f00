//! crates/study_hub_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture: the lifecycle
//! logic never knows whether a table lives in memory or in PostgreSQL, nor where
//! its clock and identifiers come from.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Entity, EntityKind};

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// The error type for all port and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A creation payload lacks a required field. Nothing was written.
    #[error("{operation}: missing required field `{field}`")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("{operation}: {kind} with ID={id} not found.")]
    NotFound {
        operation: &'static str,
        kind: EntityKind,
        id: String,
    },

    /// The backing store refused a write (capacity exceeded, connection lost, ...).
    /// Backends report their own `put` / `remove`; the hub re-attributes the
    /// failure to the operation that issued the write.
    #[error("{operation}: store write failed for {kind} with ID={id} on table {table}: {reason}")]
    StoreWrite {
        operation: &'static str,
        kind: EntityKind,
        id: String,
        table: TableId,
        reason: String,
    },

    /// A read-side failure of the backing store.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// A write failure of `table` while storing the `V` record at `key`.
    pub fn store_write<V: Entity>(
        operation: &'static str,
        table: TableId,
        key: &str,
        reason: impl Into<String>,
    ) -> Self {
        PortError::StoreWrite {
            operation,
            kind: V::KIND,
            id: key.to_string(),
            table,
            reason: reason.into(),
        }
    }

    /// Names `operation` as the source of a store write failure.
    /// Other errors pass through untouched.
    pub fn during(self, operation: &'static str) -> Self {
        match self {
            PortError::StoreWrite {
                kind,
                id,
                table,
                reason,
                ..
            } => PortError::StoreWrite {
                operation,
                kind,
                id,
                table,
                reason,
            },
            other => other,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Tables
//=========================================================================================

/// The stable namespace of a table. Keys of different tables never collide,
/// even when they share one storage medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u8);

impl TableId {
    pub const COURSES: TableId = TableId(0);
    pub const FLASHCARDS: TableId = TableId(1);
    pub const QUIZZES: TableId = TableId(2);
    pub const USERS: TableId = TableId(3);

    pub fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Course => Self::COURSES,
            EntityKind::Flashcard => Self::FLASHCARDS,
            EntityKind::Quiz => Self::QUIZZES,
            EntityKind::User => Self::USERS,
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A durable mapping from string key to one record shape.
#[async_trait]
pub trait Table<V: Entity>: Send + Sync {
    /// The namespace this table writes under.
    fn id(&self) -> TableId;

    /// Inserts or overwrites the record stored at `key`.
    async fn put(&self, key: &str, value: V) -> PortResult<()>;

    /// Point lookup. `Ok(None)` is the normal answer for an unknown key.
    async fn get(&self, key: &str) -> PortResult<Option<V>>;

    /// Removes the record at `key`; a no-op when it is absent.
    async fn remove(&self, key: &str) -> PortResult<()>;

    /// Every stored record, in no particular order.
    async fn values(&self) -> PortResult<Vec<V>>;
}

//=========================================================================================
// Capabilities
//=========================================================================================

/// Source of the current time for `created_at` / `updated_at` stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of fresh record identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}
