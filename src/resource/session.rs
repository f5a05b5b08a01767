//! A session over the in-memory store.
//!
//! A session is one physical connection. While a transaction is active it
//! accumulates writes in a private buffer; `commit` replays the buffer against
//! the shared store atomically and `rollback` discards it. Outside an active
//! transaction every write applies immediately (autocommit), the way a plain
//! connection behaves when no one has begun a transaction on it.
//!
//! Savepoints mark a position in the write buffer. Rolling back to a
//! savepoint truncates the buffer to that mark; savepoints taken after the
//! mark are dropped with it.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::resource::error::{ResourceError, ResourceResult};
use crate::resource::store::{MemoryStore, Row, WriteOp};
use crate::resource::types::{RowKey, Savepoint, SessionId, TableName};
use crate::resource::Session;

pub struct MemorySession {
    id: SessionId,
    store: MemoryStore,
    active: bool,
    buffer: Vec<WriteOp>,
    /// savepoint stack: (savepoint, buffer position when taken)
    savepoints: Vec<(Savepoint, usize)>,
    next_savepoint: u32,
}

impl MemorySession {
    pub(crate) fn new(store: MemoryStore) -> Self {
        Self {
            id: SessionId::generate(),
            store,
            active: false,
            buffer: Vec::new(),
            savepoints: Vec::new(),
            next_savepoint: 1,
        }
    }

    /// get the session ID
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// check if a transaction is active on this session
    pub fn in_transaction(&self) -> bool {
        self.active
    }

    /// number of writes buffered in the active transaction
    pub fn pending_writes(&self) -> usize {
        self.buffer.len()
    }

    // ==================== Table Operations ====================

    /// Create a new table.
    pub fn create_table(&mut self, table: &TableName) -> ResourceResult<()> {
        if self.sees_table(table) {
            return Err(ResourceError::TableAlreadyExists(table.clone()));
        }
        self.push_or_apply(WriteOp::CreateTable {
            table: table.clone(),
        })
    }

    /// Check if a table is visible to this session (committed or buffered).
    pub fn table_exists(&self, table: &TableName) -> bool {
        self.sees_table(table)
    }

    // ==================== Row Operations ====================

    /// Insert a new row.
    pub fn insert(&mut self, table: &TableName, row: Row) -> ResourceResult<()> {
        if self.read(table, &row.key)?.is_some() {
            return Err(ResourceError::RowAlreadyExists {
                table: table.clone(),
                key: row.key.clone(),
            });
        }
        self.push_or_apply(WriteOp::Insert {
            table: table.clone(),
            row,
        })
    }

    /// Insert a row from raw data.
    pub fn insert_data(
        &mut self,
        table: &TableName,
        key: RowKey,
        data: BTreeMap<String, serde_json::Value>,
    ) -> ResourceResult<()> {
        self.insert(table, Row::new(key, data))
    }

    /// Update an existing row.
    pub fn update(&mut self, table: &TableName, row: Row) -> ResourceResult<()> {
        if self.read(table, &row.key)?.is_none() {
            return Err(ResourceError::RowNotFound {
                table: table.clone(),
                key: row.key.clone(),
            });
        }
        self.push_or_apply(WriteOp::Update {
            table: table.clone(),
            row,
        })
    }

    /// Delete a row.
    pub fn delete(&mut self, table: &TableName, key: &RowKey) -> ResourceResult<()> {
        if self.read(table, key)?.is_none() {
            return Err(ResourceError::RowNotFound {
                table: table.clone(),
                key: key.clone(),
            });
        }
        self.push_or_apply(WriteOp::Delete {
            table: table.clone(),
            key: key.clone(),
        })
    }

    /// Read a single row as this session sees it: committed state overlaid
    /// with the session's own buffered writes.
    pub fn read(&self, table: &TableName, key: &RowKey) -> ResourceResult<Option<Row>> {
        if !self.sees_table(table) {
            return Err(ResourceError::TableNotFound(table.clone()));
        }

        let mut row = if self.store.table_exists(table) {
            self.store.read_row(table, key)?
        } else {
            None
        };

        for op in &self.buffer {
            match op {
                WriteOp::Insert { table: t, row: r } | WriteOp::Update { table: t, row: r }
                    if t == table && r.key == *key =>
                {
                    row = Some(r.clone());
                }
                WriteOp::Delete { table: t, key: k } if t == table && k == key => {
                    row = None;
                }
                _ => {}
            }
        }

        Ok(row)
    }

    /// Scan all rows of a table as this session sees them, in key order.
    pub fn scan(&self, table: &TableName) -> ResourceResult<Vec<Row>> {
        if !self.sees_table(table) {
            return Err(ResourceError::TableNotFound(table.clone()));
        }

        let mut rows: BTreeMap<RowKey, Row> = if self.store.table_exists(table) {
            self.store
                .scan_table(table)?
                .into_iter()
                .map(|r| (r.key.clone(), r))
                .collect()
        } else {
            BTreeMap::new()
        };

        for op in &self.buffer {
            match op {
                WriteOp::Insert { table: t, row: r } | WriteOp::Update { table: t, row: r }
                    if t == table =>
                {
                    rows.insert(r.key.clone(), r.clone());
                }
                WriteOp::Delete { table: t, key: k } if t == table => {
                    rows.remove(k);
                }
                _ => {}
            }
        }

        Ok(rows.into_values().collect())
    }

    // ==================== internals ====================

    fn sees_table(&self, table: &TableName) -> bool {
        self.store.table_exists(table)
            || self
                .buffer
                .iter()
                .any(|op| matches!(op, WriteOp::CreateTable { table: t } if t == table))
    }

    fn push_or_apply(&mut self, op: WriteOp) -> ResourceResult<()> {
        if self.active {
            self.buffer.push(op);
            Ok(())
        } else {
            // autocommit
            self.store.apply_all(std::slice::from_ref(&op))
        }
    }

    fn find_savepoint(&self, savepoint: &Savepoint) -> ResourceResult<usize> {
        self.savepoints
            .iter()
            .position(|(sp, _)| sp == savepoint)
            .ok_or_else(|| ResourceError::SavepointNotFound(savepoint.name().to_string()))
    }
}

impl Session for MemorySession {
    fn begin(&mut self) -> ResourceResult<()> {
        if self.active {
            return Err(ResourceError::SessionAlreadyActive);
        }
        trace!(session = %self.id, "begin");
        self.active = true;
        Ok(())
    }

    fn commit(&mut self) -> ResourceResult<()> {
        if !self.active {
            return Err(ResourceError::NoActiveTransaction);
        }
        debug!(session = %self.id, writes = self.buffer.len(), "commit");
        let result = self.store.apply_all(&self.buffer);
        self.buffer.clear();
        self.savepoints.clear();
        self.active = false;
        result
    }

    fn rollback(&mut self) -> ResourceResult<()> {
        if !self.active {
            return Err(ResourceError::NoActiveTransaction);
        }
        debug!(session = %self.id, discarded = self.buffer.len(), "rollback");
        self.buffer.clear();
        self.savepoints.clear();
        self.active = false;
        Ok(())
    }

    fn savepoint(&mut self) -> ResourceResult<Savepoint> {
        if !self.active {
            return Err(ResourceError::NoActiveTransaction);
        }
        let savepoint = Savepoint::new(format!("sp_{}", self.next_savepoint));
        self.next_savepoint += 1;
        trace!(session = %self.id, savepoint = %savepoint, "savepoint");
        self.savepoints.push((savepoint.clone(), self.buffer.len()));
        Ok(savepoint)
    }

    fn rollback_to_savepoint(&mut self, savepoint: &Savepoint) -> ResourceResult<()> {
        if !self.active {
            return Err(ResourceError::NoActiveTransaction);
        }
        let position = self.find_savepoint(savepoint)?;
        let (_, mark) = self.savepoints[position];
        trace!(session = %self.id, savepoint = %savepoint, "rollback to savepoint");
        self.buffer.truncate(mark);
        // savepoints taken after this one point past the truncation
        self.savepoints.truncate(position + 1);
        Ok(())
    }

    fn release_savepoint(&mut self, savepoint: Savepoint) -> ResourceResult<()> {
        if !self.active {
            return Err(ResourceError::NoActiveTransaction);
        }
        let position = self.find_savepoint(&savepoint)?;
        trace!(session = %self.id, savepoint = %savepoint, "release savepoint");
        self.savepoints.truncate(position);
        Ok(())
    }
}
