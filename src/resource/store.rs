//! In-memory committed state shared by all sessions.
//!
//! The store holds the data every committed transaction has produced so far.
//! Sessions buffer their writes privately and replay the whole buffer here at
//! commit; the replay happens under a single write lock and is all-or-nothing,
//! so readers never observe a half-applied commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resource::error::{ResourceError, ResourceResult};
use crate::resource::session::MemorySession;
use crate::resource::types::{RowKey, TableName};
use crate::resource::Resource;

/// a row with metadata and user data
///
/// The serialized format:
/// ```json
/// {
///   "_pk": "abc123",
///   "_version": 1,
///   "_created_at": "xxxx-xx-xxT00:00:00Z",
///   "_updated_at": "xxxx-xx-xxT00:00:00Z",
///   "name": "abc",
///   "email": "abc@example.com"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// primary key
    #[serde(rename = "_pk")]
    pub key: RowKey,
    /// version number, bumped by the store on every update
    #[serde(rename = "_version")]
    pub version: u64,
    /// creation timestamp
    #[serde(rename = "_created_at")]
    pub created_at: DateTime<Utc>,
    /// last update timestamp
    #[serde(rename = "_updated_at")]
    pub updated_at: DateTime<Utc>,
    /// data (column values)
    #[serde(flatten)]
    pub data: BTreeMap<String, Value>,
}

impl Row {
    /// creates a new row with key & data, at version 1
    pub fn new(key: RowKey, data: BTreeMap<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            key,
            version: 1,
            created_at: now,
            updated_at: now,
            data,
        }
    }

    /// create a new row from a JSON value
    pub fn from_value(key: RowKey, value: Value) -> ResourceResult<Self> {
        let data = match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => {
                return Err(ResourceError::SchemaViolation(
                    "row data must be a JSON object".to_string(),
                ))
            }
        };
        Ok(Self::new(key, data))
    }

    /// get a column value by name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }

    /// check if the row has a column
    pub fn has_column(&self, column: &str) -> bool {
        self.data.contains_key(column)
    }
}

/// one buffered write, replayed against the store at commit
#[derive(Debug, Clone)]
pub(crate) enum WriteOp {
    CreateTable { table: TableName },
    Insert { table: TableName, row: Row },
    Update { table: TableName, row: Row },
    Delete { table: TableName, key: RowKey },
}

/// committed tables and rows
#[derive(Debug, Clone, Default)]
struct StoreState {
    tables: HashMap<TableName, BTreeMap<RowKey, Row>>,
}

impl StoreState {
    /// apply one op, validating against the current state
    fn apply(&mut self, op: &WriteOp) -> ResourceResult<()> {
        match op {
            WriteOp::CreateTable { table } => {
                if self.tables.contains_key(table) {
                    return Err(ResourceError::TableAlreadyExists(table.clone()));
                }
                self.tables.insert(table.clone(), BTreeMap::new());
            }
            WriteOp::Insert { table, row } => {
                let rows = self
                    .tables
                    .get_mut(table)
                    .ok_or_else(|| ResourceError::TableNotFound(table.clone()))?;
                if rows.contains_key(&row.key) {
                    return Err(ResourceError::RowAlreadyExists {
                        table: table.clone(),
                        key: row.key.clone(),
                    });
                }
                rows.insert(row.key.clone(), row.clone());
            }
            WriteOp::Update { table, row } => {
                let rows = self
                    .tables
                    .get_mut(table)
                    .ok_or_else(|| ResourceError::TableNotFound(table.clone()))?;
                let existing = rows.get(&row.key).ok_or_else(|| ResourceError::RowNotFound {
                    table: table.clone(),
                    key: row.key.clone(),
                })?;
                let updated = Row {
                    key: row.key.clone(),
                    version: existing.version + 1,
                    created_at: existing.created_at,
                    updated_at: Utc::now(),
                    data: row.data.clone(),
                };
                rows.insert(row.key.clone(), updated);
            }
            WriteOp::Delete { table, key } => {
                let rows = self
                    .tables
                    .get_mut(table)
                    .ok_or_else(|| ResourceError::TableNotFound(table.clone()))?;
                if rows.remove(key).is_none() {
                    return Err(ResourceError::RowNotFound {
                        table: table.clone(),
                        key: key.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Shared in-memory store.
///
/// Thread-safe: can be shared across threads via Clone (uses Arc internally).
/// Implements [`Resource`]: `open()` hands out a [`MemorySession`] backed by
/// this store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table directly, outside any transaction.
    pub fn create_table(&self, table: &TableName) -> ResourceResult<()> {
        self.apply_all(&[WriteOp::CreateTable {
            table: table.clone(),
        }])
    }

    /// Read a committed row.
    pub fn read_row(&self, table: &TableName, key: &RowKey) -> ResourceResult<Option<Row>> {
        let state = self.inner.read();
        let rows = state
            .tables
            .get(table)
            .ok_or_else(|| ResourceError::TableNotFound(table.clone()))?;
        Ok(rows.get(key).cloned())
    }

    /// Scan all committed rows of a table, in key order.
    pub fn scan_table(&self, table: &TableName) -> ResourceResult<Vec<Row>> {
        let state = self.inner.read();
        let rows = state
            .tables
            .get(table)
            .ok_or_else(|| ResourceError::TableNotFound(table.clone()))?;
        Ok(rows.values().cloned().collect())
    }

    /// Check if a table exists in committed state.
    pub fn table_exists(&self, table: &TableName) -> bool {
        self.inner.read().tables.contains_key(table)
    }

    /// Number of committed rows in a table.
    pub fn row_count(&self, table: &TableName) -> ResourceResult<usize> {
        let state = self.inner.read();
        let rows = state
            .tables
            .get(table)
            .ok_or_else(|| ResourceError::TableNotFound(table.clone()))?;
        Ok(rows.len())
    }

    /// Apply a batch of writes atomically.
    ///
    /// The batch is replayed against a staged copy of the state; only if every
    /// op validates does the staged state replace the live one. A failed
    /// commit therefore leaves the store untouched.
    pub(crate) fn apply_all(&self, ops: &[WriteOp]) -> ResourceResult<()> {
        let mut state = self.inner.write();
        let mut staged = state.clone();
        for op in ops {
            staged.apply(op)?;
        }
        *state = staged;
        Ok(())
    }
}

impl Resource for MemoryStore {
    type Session = MemorySession;

    fn open(&self) -> ResourceResult<MemorySession> {
        Ok(MemorySession::new(self.clone()))
    }
}
