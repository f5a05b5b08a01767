//! Transaction manager - propagation decisions and completion.
//!
//! The TransactionManager is the entry point for transactional work.
//! It handles:
//! - Deciding how a begin request relates to the bound transaction
//!   (join, suspend and start new, savepoint, run unbound, reject)
//! - Executing commit/rollback with correct ownership: only the owner of a
//!   physical transaction ever touches the resource
//! - Rollback-only propagation: a failing participant poisons the owner
//!   instead of rolling back itself
//! - Restoring suspended transactions when the suspending scope completes

use std::fmt;

use tracing::{debug, trace};

use crate::resource::{Resource, Session};
use crate::transaction::context::TransactionContext;
use crate::transaction::error::{TransactionError, TransactionResult};
use crate::transaction::propagation::{Completion, Propagation};
use crate::transaction::status::{ActiveTransaction, TransactionStatus};

/// Transaction manager over a [`Resource`].
///
/// Stateless apart from the resource handle: all per-transaction state lives
/// in the [`TransactionContext`] and the statuses this manager hands out, so
/// one manager serves any number of execution contexts.
pub struct TransactionManager<R: Resource> {
    resource: R,
}

impl<R: Resource> TransactionManager<R> {
    /// Create a new transaction manager for the given resource.
    pub fn new(resource: R) -> Self {
        Self { resource }
    }

    /// Get a reference to the underlying resource.
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Begin a transactional scope with the given propagation behavior.
    ///
    /// Every returned status must be handed to exactly one of
    /// [`commit`](Self::commit), [`rollback`](Self::rollback) or
    /// [`complete`](Self::complete); the status is consumed there, so a
    /// second completion cannot be expressed.
    /// [`with_transaction`](Self::with_transaction) does this bookkeeping
    /// for you.
    pub fn begin(
        &self,
        ctx: &mut TransactionContext<R::Session>,
        propagation: Propagation,
    ) -> TransactionResult<TransactionStatus<R::Session>> {
        let Some(current) = ctx.current().cloned() else {
            return self.begin_without_existing(ctx, propagation);
        };

        match propagation {
            Propagation::Required | Propagation::Supports | Propagation::Mandatory => {
                current.enter();
                trace!(tx = %current.id(), depth = current.depth(), "joining existing transaction");
                Ok(TransactionStatus::participant(current))
            }
            Propagation::RequiresNew => {
                let suspended = ctx.unbind();
                debug!(tx = %current.id(), "suspending transaction");
                let transaction = match self.start_transaction() {
                    Ok(transaction) => transaction,
                    Err(e) => {
                        // the suspended transaction must not be lost
                        Self::resume(ctx, suspended);
                        return Err(e);
                    }
                };
                ctx.bind(transaction.clone());
                Ok(TransactionStatus::new_transaction(
                    transaction,
                    false,
                    suspended,
                ))
            }
            Propagation::Nested => {
                let savepoint = current.with_session(|s| s.savepoint())?;
                trace!(tx = %current.id(), savepoint = %savepoint, "nesting via savepoint");
                Ok(TransactionStatus::nested(current, savepoint))
            }
            Propagation::NotSupported => {
                let suspended = ctx.unbind();
                debug!(tx = %current.id(), "suspending transaction, running unbound");
                Ok(TransactionStatus::non_transactional(suspended))
            }
            Propagation::Never => Err(TransactionError::ExistingTransaction { propagation }),
        }
    }

    fn begin_without_existing(
        &self,
        ctx: &mut TransactionContext<R::Session>,
        propagation: Propagation,
    ) -> TransactionResult<TransactionStatus<R::Session>> {
        match propagation {
            Propagation::Required
            | Propagation::RequiresNew
            | Propagation::Nested
            | Propagation::Supports => {
                let transaction = self.start_transaction()?;
                ctx.bind(transaction.clone());
                Ok(TransactionStatus::new_transaction(transaction, true, None))
            }
            Propagation::Mandatory => Err(TransactionError::NoExistingTransaction { propagation }),
            Propagation::NotSupported | Propagation::Never => {
                trace!(%propagation, "running non-transactionally");
                Ok(TransactionStatus::non_transactional(None))
            }
        }
    }

    fn start_transaction(&self) -> TransactionResult<ActiveTransaction<R::Session>> {
        let mut session = self.resource.open()?;
        session.begin()?;
        let transaction = ActiveTransaction::new(session);
        debug!(tx = %transaction.id(), "started new transaction");
        Ok(transaction)
    }

    /// Commit the scope described by `status`.
    ///
    /// Only an owning status commits physically. A status whose transaction
    /// was marked rollback-only by another participant rolls back instead
    /// and, if it is the owner, reports [`TransactionError::UnexpectedRollback`]
    /// so the caller learns its commit did not happen.
    pub fn commit(
        &self,
        ctx: &mut TransactionContext<R::Session>,
        status: TransactionStatus<R::Session>,
    ) -> TransactionResult<()> {
        if status.rollback_only {
            // the caller itself asked for rollback-only: no surprise to report
            debug!("commit requested on a rollback-only status, rolling back instead");
            return self.process_rollback(ctx, status);
        }

        let poisoned = status
            .transaction
            .as_ref()
            .is_some_and(|tx| tx.is_rollback_only());
        if poisoned && status.is_new_transaction {
            self.process_rollback(ctx, status)?;
            return Err(TransactionError::UnexpectedRollback);
        }

        self.process_commit(ctx, status)
    }

    /// Roll back the scope described by `status`.
    ///
    /// An owning status rolls back physically. A joined participant performs
    /// NO physical action: it marks the shared transaction rollback-only, so
    /// the owner's eventual commit turns into a rollback. A nested status
    /// unwinds to its savepoint, leaving the enclosing transaction intact.
    pub fn rollback(
        &self,
        ctx: &mut TransactionContext<R::Session>,
        status: TransactionStatus<R::Session>,
    ) -> TransactionResult<()> {
        self.process_rollback(ctx, status)
    }

    /// Complete the scope with the requested outcome.
    pub fn complete(
        &self,
        ctx: &mut TransactionContext<R::Session>,
        status: TransactionStatus<R::Session>,
        outcome: Completion,
    ) -> TransactionResult<()> {
        match outcome {
            Completion::Commit => self.commit(ctx, status),
            Completion::Rollback => self.rollback(ctx, status),
        }
    }

    fn process_commit(
        &self,
        ctx: &mut TransactionContext<R::Session>,
        status: TransactionStatus<R::Session>,
    ) -> TransactionResult<()> {
        let TransactionStatus {
            transaction,
            is_new_transaction,
            savepoint,
            suspended,
            ..
        } = status;

        match transaction {
            Some(tx) => {
                if let Some(sp) = savepoint {
                    trace!(tx = %tx.id(), savepoint = %sp, "releasing savepoint");
                    tx.with_session(|s| s.release_savepoint(sp))?;
                } else if is_new_transaction {
                    debug!(tx = %tx.id(), "committing transaction");
                    // unbind and resume happen even when the physical commit
                    // fails, otherwise the context keeps a dead transaction
                    let result = tx.with_session(|s| s.commit());
                    ctx.unbind();
                    Self::resume(ctx, suspended);
                    result?;
                } else {
                    trace!(tx = %tx.id(), "participant commit, deferring to owner");
                    tx.exit();
                }
                Ok(())
            }
            None => {
                Self::resume(ctx, suspended);
                Ok(())
            }
        }
    }

    fn process_rollback(
        &self,
        ctx: &mut TransactionContext<R::Session>,
        status: TransactionStatus<R::Session>,
    ) -> TransactionResult<()> {
        let TransactionStatus {
            transaction,
            is_new_transaction,
            savepoint,
            suspended,
            ..
        } = status;

        match transaction {
            Some(tx) => {
                if let Some(sp) = savepoint {
                    debug!(tx = %tx.id(), savepoint = %sp, "rolling back to savepoint");
                    tx.with_session(|s| {
                        s.rollback_to_savepoint(&sp)?;
                        s.release_savepoint(sp)
                    })?;
                } else if is_new_transaction {
                    debug!(tx = %tx.id(), "rolling back transaction");
                    let result = tx.with_session(|s| s.rollback());
                    ctx.unbind();
                    Self::resume(ctx, suspended);
                    result?;
                } else {
                    debug!(tx = %tx.id(), "participant rollback, marking transaction rollback-only");
                    tx.set_rollback_only();
                    tx.exit();
                }
                Ok(())
            }
            None => {
                Self::resume(ctx, suspended);
                Ok(())
            }
        }
    }

    fn resume(
        ctx: &mut TransactionContext<R::Session>,
        suspended: Option<ActiveTransaction<R::Session>>,
    ) {
        if let Some(tx) = suspended {
            debug!(tx = %tx.id(), "resuming suspended transaction");
            ctx.bind(tx);
        }
    }

    /// Execute a closure inside a transactional scope with the default
    /// propagation ([`Propagation::Required`]), committing on `Ok` and
    /// rolling back on `Err`.
    pub fn with_transaction<T, F>(
        &self,
        ctx: &mut TransactionContext<R::Session>,
        f: F,
    ) -> TransactionResult<T>
    where
        F: FnOnce(&mut TransactionContext<R::Session>) -> TransactionResult<T>,
    {
        self.with_propagation(ctx, Propagation::default(), f)
    }

    /// Execute a closure inside a transactional scope with a specific
    /// propagation behavior.
    ///
    /// A completion call is guaranteed on every exit path: `Ok` maps to
    /// commit, `Err` maps to rollback (which for a joined participant means
    /// poisoning the owner, not rolling back). An `UnexpectedRollback`
    /// surfacing from the commit is returned to the caller.
    pub fn with_propagation<T, F>(
        &self,
        ctx: &mut TransactionContext<R::Session>,
        propagation: Propagation,
        f: F,
    ) -> TransactionResult<T>
    where
        F: FnOnce(&mut TransactionContext<R::Session>) -> TransactionResult<T>,
    {
        let status = self.begin(ctx, propagation)?;

        match f(ctx) {
            Ok(result) => {
                self.commit(ctx, status)?;
                Ok(result)
            }
            Err(e) => {
                self.rollback(ctx, status)?;
                Err(e)
            }
        }
    }
}

impl<R: Resource> fmt::Debug for TransactionManager<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManager").finish_non_exhaustive()
    }
}
