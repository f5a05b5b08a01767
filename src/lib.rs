//! txnest - Nested Transaction Propagation
//!
//! This crate decides, for each request to begin a unit of work, whether to
//! join the transaction already in flight, suspend it and start a new one,
//! nest via savepoint, run non-transactionally, or reject the request - and
//! then executes commit/rollback with correct ownership semantics: only the
//! outermost owner touches the physical resource, and an inner participant
//! that fails poisons the owner instead of rolling back itself.
//!
//! # Example
//!
//! ```
//! use txnest::resource::MemoryStore;
//! use txnest::transaction::{Propagation, TransactionContext, TransactionManager};
//!
//! # fn main() -> txnest::transaction::TransactionResult<()> {
//! let manager = TransactionManager::new(MemoryStore::new());
//! let mut ctx = TransactionContext::new();
//!
//! let status = manager.begin(&mut ctx, Propagation::Required)?;
//! // ... do work against the session bound in `ctx` ...
//! manager.commit(&mut ctx, status)?;
//! # Ok(())
//! # }
//! ```

#![allow(dead_code)] // Some methods are for public API extensibility

pub mod resource;
pub mod transaction;
