//! resource layer for txnest
//!
//! this module is the seam between the transaction core and the physical
//! resource. The core only talks to the [`Resource`] and [`Session`] traits
//! and never touches an engine directly; [`MemoryStore`]/[`MemorySession`]
//! provide the built-in engine behind that seam.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  transaction core                           │
//! │        (propagation decisions, completion, ownership)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                 Resource::open() -> Session
//!            begin / commit / rollback / savepoint
//!                              │
//!        ┌─────────────────────┴─────────────────────┐
//!        │                                           │
//!        ▼                                           ▼
//!  ┌─────────────┐                            ┌─────────────┐
//!  │MemorySession│── buffered writes, replay ▶│ MemoryStore │
//!  │ (per conn)  │    at commit               │ (committed) │
//!  └─────────────┘                            └─────────────┘
//! ```

mod error;
mod session;
mod store;
mod types;

// Re-export public API
pub use error::{ResourceError, ResourceResult};
pub use session::MemorySession;
pub use store::{MemoryStore, Row};
pub use types::{InvalidNameError, RowKey, Savepoint, SessionId, TableName};

/// A transactional resource that can hand out sessions.
///
/// One session wraps one physical connection. The transaction core opens a
/// fresh session for every transaction it owns.
pub trait Resource {
    type Session: Session;

    /// Open a new session against this resource.
    fn open(&self) -> ResourceResult<Self::Session>;
}

/// One physical connection with transaction and savepoint support.
///
/// The transaction core drives these operations; it never calls them twice
/// for the same logical transaction (ownership lives in the core, not here).
pub trait Session {
    /// Start a transaction on this session.
    fn begin(&mut self) -> ResourceResult<()>;

    /// Commit the active transaction.
    fn commit(&mut self) -> ResourceResult<()>;

    /// Roll back the active transaction, discarding its writes.
    fn rollback(&mut self) -> ResourceResult<()>;

    /// Take a savepoint inside the active transaction.
    fn savepoint(&mut self) -> ResourceResult<Savepoint>;

    /// Discard all writes made since the savepoint was taken.
    fn rollback_to_savepoint(&mut self, savepoint: &Savepoint) -> ResourceResult<()>;

    /// Release a savepoint without rolling back.
    fn release_savepoint(&mut self, savepoint: Savepoint) -> ResourceResult<()>;
}
