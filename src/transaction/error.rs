//! Transaction error types.

use thiserror::Error;

use crate::resource::ResourceError;
use crate::transaction::propagation::Propagation;

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Errors that can occur during transaction operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Physical resource error, propagated unchanged.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// A propagation behavior that requires an existing transaction found none.
    #[error("no existing transaction: propagation {propagation} requires one")]
    NoExistingTransaction { propagation: Propagation },

    /// A propagation behavior that forbids a transaction found one bound.
    #[error("existing transaction found: propagation {propagation} forbids one")]
    ExistingTransaction { propagation: Propagation },

    /// Commit discovered the transaction was already doomed: an inner
    /// participant marked it rollback-only, so the owner's commit performed
    /// a physical rollback instead.
    #[error("transaction rolled back because a participant marked it rollback-only")]
    UnexpectedRollback,

    /// Internal error, mostly useful for mapping business failures onto a
    /// rollback completion in tests and demos.
    #[error("internal transaction error: {0}")]
    Internal(String),
}

impl TransactionError {
    /// Check if this error reports a silently-doomed commit.
    pub fn is_unexpected_rollback(&self) -> bool {
        matches!(self, TransactionError::UnexpectedRollback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::TableName;

    #[test]
    fn test_unexpected_rollback_classification() {
        assert!(TransactionError::UnexpectedRollback.is_unexpected_rollback());
        assert!(!TransactionError::Internal("boom".to_string()).is_unexpected_rollback());
    }

    #[test]
    fn test_resource_error_wraps_unchanged() {
        let inner = ResourceError::TableNotFound(TableName::new("members").unwrap());
        let wrapped = TransactionError::from(inner);
        match wrapped {
            TransactionError::Resource(ResourceError::TableNotFound(table)) => {
                assert_eq!(table.as_str(), "members");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
