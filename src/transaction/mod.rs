//! Transaction propagation core.
//!
//! This module decides how each begin request relates to the transaction
//! already bound to the execution context, and executes completion with
//! correct ownership semantics: joins are physical no-ops, a failing
//! participant poisons the owner via the rollback-only flag, REQUIRES_NEW
//! suspends and resumes LIFO, and NESTED unwinds to a savepoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TransactionManager                        │
//! │      (propagation decisions, commit/rollback, resume)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │ Transaction │       │ Transaction │       │ Propagation │
//!  │   Context   │       │   Status    │       │  (policy)   │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use txnest::transaction::{Propagation, TransactionContext, TransactionManager};
//!
//! let manager = TransactionManager::new(store);
//! let mut ctx = TransactionContext::new();
//!
//! manager.with_transaction(&mut ctx, |ctx| {
//!     // work against the bound session; nested calls that begin with
//!     // Propagation::Required join this transaction
//!     repository.save(ctx, item)
//! })?;
//! ```

mod context;
mod error;
mod manager;
mod propagation;
mod status;

pub use context::TransactionContext;
pub use error::{TransactionError, TransactionResult};
pub use manager::TransactionManager;
pub use propagation::{Completion, Propagation};
pub use status::{ActiveTransaction, TransactionStatus};
