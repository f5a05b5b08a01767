//! Transaction state shared between participants, and the per-begin status.
//!
//! [`ActiveTransaction`] is what the execution context binds: one physical
//! session plus the flags every participant of the transaction can see. It is
//! a cheap cloneable handle; all clones refer to the same transaction.
//!
//! [`TransactionStatus`] is the value every `begin` produces and every
//! completion consumes. It records how this particular participation relates
//! to the physical transaction: whether it owns it, whether it merely joined,
//! whether it nests via savepoint, and which transaction (if any) it
//! suspended on the way in.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::resource::Savepoint;

struct ActiveInner<S> {
    id: String,
    started_at: DateTime<Utc>,
    session: Mutex<S>,
    /// monotonic: set by a failing participant, never cleared
    rollback_only: AtomicBool,
    /// participants currently attached (owner plus joins)
    depth: AtomicUsize,
}

/// A live transaction bound to an execution context.
///
/// Cloning produces another handle to the same transaction; inner joined
/// participants hold clones of the handle the owner created.
pub struct ActiveTransaction<S> {
    inner: Arc<ActiveInner<S>>,
}

impl<S> Clone for ActiveTransaction<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> ActiveTransaction<S> {
    /// Wrap a session whose physical transaction has already begun.
    pub(crate) fn new(session: S) -> Self {
        Self {
            inner: Arc::new(ActiveInner {
                id: ulid::Ulid::new().to_string().to_lowercase(),
                started_at: Utc::now(),
                session: Mutex::new(session),
                rollback_only: AtomicBool::new(false),
                depth: AtomicUsize::new(1),
            }),
        }
    }

    /// Get the transaction ID.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// When the transaction started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Check if some participant has doomed this transaction.
    pub fn is_rollback_only(&self) -> bool {
        self.inner.rollback_only.load(Ordering::SeqCst)
    }

    pub(crate) fn set_rollback_only(&self) {
        self.inner.rollback_only.store(true, Ordering::SeqCst);
    }

    /// Number of participants currently attached.
    pub fn depth(&self) -> usize {
        self.inner.depth.load(Ordering::SeqCst)
    }

    pub(crate) fn enter(&self) {
        self.inner.depth.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn exit(&self) {
        self.inner.depth.fetch_sub(1, Ordering::SeqCst);
    }

    /// Run a closure against the transaction's session.
    ///
    /// This is how work inside a transactional boundary reaches the bound
    /// connection: look the transaction up in the context, then go through
    /// here rather than opening a session of your own.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        let mut session = self.inner.session.lock();
        f(&mut session)
    }
}

impl<S> fmt::Debug for ActiveTransaction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveTransaction")
            .field("id", &self.inner.id)
            .field("depth", &self.depth())
            .field("rollback_only", &self.is_rollback_only())
            .finish()
    }
}

/// One participation in a transaction, produced by `begin` and consumed by
/// exactly one completion call.
///
/// Move semantics make double completion unrepresentable: commit and rollback
/// take the status by value.
pub struct TransactionStatus<S> {
    /// the transaction this participation is attached to, if any
    pub(crate) transaction: Option<ActiveTransaction<S>>,
    /// this participation owns the physical begin/commit/rollback
    pub(crate) is_new_transaction: bool,
    /// no enclosing transaction existed when this one began
    pub(crate) is_outermost: bool,
    /// set for nested participations; completion targets the savepoint
    pub(crate) savepoint: Option<Savepoint>,
    /// the transaction displaced on the way in, restored at completion
    pub(crate) suspended: Option<ActiveTransaction<S>>,
    /// local rollback-only request, honored at completion
    pub(crate) rollback_only: bool,
}

impl<S> TransactionStatus<S> {
    pub(crate) fn new_transaction(
        transaction: ActiveTransaction<S>,
        is_outermost: bool,
        suspended: Option<ActiveTransaction<S>>,
    ) -> Self {
        Self {
            transaction: Some(transaction),
            is_new_transaction: true,
            is_outermost,
            savepoint: None,
            suspended,
            rollback_only: false,
        }
    }

    pub(crate) fn participant(transaction: ActiveTransaction<S>) -> Self {
        Self {
            transaction: Some(transaction),
            is_new_transaction: false,
            is_outermost: false,
            savepoint: None,
            suspended: None,
            rollback_only: false,
        }
    }

    pub(crate) fn nested(transaction: ActiveTransaction<S>, savepoint: Savepoint) -> Self {
        Self {
            transaction: Some(transaction),
            is_new_transaction: false,
            is_outermost: false,
            savepoint: Some(savepoint),
            suspended: None,
            rollback_only: false,
        }
    }

    pub(crate) fn non_transactional(suspended: Option<ActiveTransaction<S>>) -> Self {
        Self {
            transaction: None,
            is_new_transaction: false,
            is_outermost: false,
            savepoint: None,
            suspended,
            rollback_only: false,
        }
    }

    /// Check if this participation owns the physical transaction.
    pub fn is_new_transaction(&self) -> bool {
        self.is_new_transaction
    }

    /// Check if this participation began with no enclosing transaction.
    pub fn is_outermost(&self) -> bool {
        self.is_outermost
    }

    /// Check if this participation runs inside a transaction at all.
    pub fn has_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Check if this participation nests via savepoint.
    pub fn uses_savepoint(&self) -> bool {
        self.savepoint.is_some()
    }

    /// Get the transaction this participation is attached to.
    pub fn transaction(&self) -> Option<&ActiveTransaction<S>> {
        self.transaction.as_ref()
    }

    /// Request a rollback outcome for this participation without raising an
    /// error: the eventual completion treats commit as rollback. An owner
    /// rolls back silently; a participant poisons the owner.
    pub fn set_rollback_only(&mut self) {
        self.rollback_only = true;
    }

    /// Check if a rollback outcome is already decided, either locally via
    /// [`set_rollback_only`](Self::set_rollback_only) or globally by another
    /// participant of the same transaction.
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
            || self
                .transaction
                .as_ref()
                .is_some_and(|tx| tx.is_rollback_only())
    }
}

impl<S> fmt::Debug for TransactionStatus<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionStatus")
            .field("transaction", &self.transaction.as_ref().map(|tx| tx.id()))
            .field("is_new_transaction", &self.is_new_transaction)
            .field("is_outermost", &self.is_outermost)
            .field("savepoint", &self.savepoint)
            .field("suspended", &self.suspended.as_ref().map(|tx| tx.id()))
            .field("rollback_only", &self.rollback_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MemoryStore, Resource};

    fn active() -> ActiveTransaction<crate::resource::MemorySession> {
        let store = MemoryStore::new();
        ActiveTransaction::new(store.open().unwrap())
    }

    #[test]
    fn test_handle_clones_share_state() {
        let tx = active();
        let other = tx.clone();

        assert_eq!(tx.id(), other.id());
        assert!(!other.is_rollback_only());

        tx.set_rollback_only();
        assert!(other.is_rollback_only());
    }

    #[test]
    fn test_rollback_only_is_monotonic() {
        let tx = active();
        tx.set_rollback_only();
        tx.set_rollback_only();
        assert!(tx.is_rollback_only());
    }

    #[test]
    fn test_depth_tracking() {
        let tx = active();
        assert_eq!(tx.depth(), 1);
        tx.enter();
        assert_eq!(tx.depth(), 2);
        tx.exit();
        assert_eq!(tx.depth(), 1);
    }

    #[test]
    fn test_status_flags() {
        let tx = active();

        let owner = TransactionStatus::new_transaction(tx.clone(), true, None);
        assert!(owner.is_new_transaction());
        assert!(owner.is_outermost());
        assert!(owner.has_transaction());
        assert!(!owner.uses_savepoint());

        let joined = TransactionStatus::participant(tx.clone());
        assert!(!joined.is_new_transaction());
        assert!(!joined.is_outermost());
        assert!(joined.has_transaction());

        let empty = TransactionStatus::<crate::resource::MemorySession>::non_transactional(None);
        assert!(!empty.has_transaction());
        assert!(!empty.is_new_transaction());
    }

    #[test]
    fn test_status_sees_global_rollback_only() {
        let tx = active();
        let joined = TransactionStatus::participant(tx.clone());
        assert!(!joined.is_rollback_only());

        tx.set_rollback_only();
        assert!(joined.is_rollback_only());
    }

    #[test]
    fn test_local_rollback_only() {
        let tx = active();
        let mut owner = TransactionStatus::new_transaction(tx.clone(), true, None);
        owner.set_rollback_only();

        assert!(owner.is_rollback_only());
        // local flag stays local until completion
        assert!(!tx.is_rollback_only());
    }
}
