//! Resource layer error types
//!
//! All errors that can occur against the physical resource are defined here.
//! We use `thiserror` for ergonomic error definition and better error messages

use thiserror::Error;

use crate::resource::types::{InvalidNameError, RowKey, TableName};

/// the main error type for resource operations
#[derive(Debug, Error)]
pub enum ResourceError {
    /// begin was called while a transaction is already active on the session
    #[error("session already has an active transaction")]
    SessionAlreadyActive,

    /// commit/rollback/savepoint was called with no active transaction
    #[error("no active transaction on this session")]
    NoActiveTransaction,

    /// the requested table was not found
    #[error("table not found: {0}")]
    TableNotFound(TableName),

    /// the table already exists
    #[error("table already exists: {0}")]
    TableAlreadyExists(TableName),

    /// the row already exists (duplicate primary key)
    #[error("row already exists: table={table}, key={key}")]
    RowAlreadyExists { table: TableName, key: RowKey },

    /// the requested row was not found
    #[error("row not found: table={table}, key={key}")]
    RowNotFound { table: TableName, key: RowKey },

    /// the savepoint is unknown to this session (never taken, or dropped
    /// by a rollback/release of an earlier savepoint)
    #[error("savepoint not found: {0}")]
    SavepointNotFound(String),

    /// invalid table or row name
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    /// the row data doesn't match the expected shape
    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

impl ResourceError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ResourceError::TableNotFound(_)
                | ResourceError::RowNotFound { .. }
                | ResourceError::SavepointNotFound(_)
        )
    }

    /// check if this error is a conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ResourceError::TableAlreadyExists(_) | ResourceError::RowAlreadyExists { .. }
        )
    }
}

/// result type alias for resource operations
pub type ResourceResult<T> = Result<T, ResourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let not_found = ResourceError::TableNotFound(TableName::new("members").unwrap());
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = ResourceError::RowAlreadyExists {
            table: TableName::new("members").unwrap(),
            key: RowKey::new("123").unwrap(),
        };
        assert!(!conflict.is_not_found());
        assert!(conflict.is_conflict());
    }
}
