//! Execution-context binding for the current transaction.
//!
//! One `TransactionContext` belongs to one logical execution context (a
//! thread, a task) and carries the transaction currently bound there. There
//! is no hidden thread-local: the context is threaded explicitly through
//! every `begin`/`complete` call and every transactional closure, which is
//! also what forces nested work onto the same execution context.

use crate::transaction::status::ActiveTransaction;

/// Holds the transaction bound to the current execution context, if any.
///
/// At most one transaction is bound at a time. Suspension (REQUIRES_NEW,
/// NOT_SUPPORTED) unbinds the current transaction into the suspending
/// status, which rebinds it at its own completion - LIFO by construction.
pub struct TransactionContext<S> {
    current: Option<ActiveTransaction<S>>,
}

impl<S> TransactionContext<S> {
    /// Create a context with nothing bound.
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Check if a transaction is bound.
    pub fn has_transaction(&self) -> bool {
        self.current.is_some()
    }

    /// Get the bound transaction.
    pub fn current(&self) -> Option<&ActiveTransaction<S>> {
        self.current.as_ref()
    }

    /// Participant count of the bound transaction, 0 when none is bound.
    pub fn depth(&self) -> usize {
        self.current.as_ref().map_or(0, |tx| tx.depth())
    }

    /// Check if the bound transaction is already doomed.
    pub fn is_rollback_only(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|tx| tx.is_rollback_only())
    }

    /// Run a closure against the bound transaction's session.
    ///
    /// Returns `None` when no transaction is bound; callers that should work
    /// outside transactions too (repositories, for instance) fall back to a
    /// session of their own in that case.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut S) -> T) -> Option<T> {
        self.current.as_ref().map(|tx| tx.with_session(f))
    }

    /// Bind a transaction. The caller must have unbound any previous one.
    pub(crate) fn bind(&mut self, transaction: ActiveTransaction<S>) {
        debug_assert!(self.current.is_none(), "context already has a transaction");
        self.current = Some(transaction);
    }

    /// Unbind and return the current transaction.
    pub(crate) fn unbind(&mut self) -> Option<ActiveTransaction<S>> {
        self.current.take()
    }
}

impl<S> Default for TransactionContext<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for TransactionContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("current", &self.current.as_ref().map(|tx| tx.id()))
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MemorySession, MemoryStore, Resource};

    fn active() -> ActiveTransaction<MemorySession> {
        let store = MemoryStore::new();
        ActiveTransaction::new(store.open().unwrap())
    }

    #[test]
    fn test_bind_unbind() {
        let mut ctx = TransactionContext::new();
        assert!(!ctx.has_transaction());
        assert_eq!(ctx.depth(), 0);

        let tx = active();
        let id = tx.id().to_string();
        ctx.bind(tx);

        assert!(ctx.has_transaction());
        assert_eq!(ctx.current().unwrap().id(), id);
        assert_eq!(ctx.depth(), 1);

        let unbound = ctx.unbind().unwrap();
        assert_eq!(unbound.id(), id);
        assert!(!ctx.has_transaction());
    }

    #[test]
    fn test_with_session_without_transaction() {
        let ctx = TransactionContext::<MemorySession>::new();
        assert!(ctx.with_session(|_s| ()).is_none());
    }

    #[test]
    fn test_rollback_only_passthrough() {
        let mut ctx = TransactionContext::new();
        let tx = active();
        ctx.bind(tx.clone());

        assert!(!ctx.is_rollback_only());
        tx.set_rollback_only();
        assert!(ctx.is_rollback_only());
    }
}
