//! Transaction propagation behaviors.
//!
//! A propagation behavior governs how a begin-transaction request interacts
//! with a transaction that is already bound to the execution context: join
//! it, suspend it and start fresh, nest via savepoint, run outside it, or
//! reject the situation outright.

use std::fmt;

/// Transaction propagation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Join the bound transaction; start a new one if none is bound.
    ///
    /// The common default: nested calls share one physical transaction and
    /// the outermost caller owns commit/rollback.
    #[default]
    Required,

    /// Always start a new physical transaction.
    ///
    /// A bound transaction is suspended for the duration and resumed
    /// afterwards. The new transaction commits or rolls back independently
    /// of the suspended one's eventual fate.
    RequiresNew,

    /// Nest inside the bound transaction via savepoint.
    ///
    /// A rollback of the nested scope only unwinds to the savepoint; the
    /// enclosing transaction carries on. Starts a new transaction if none
    /// is bound.
    Nested,

    /// Join the bound transaction; start a new one if none is bound.
    ///
    /// Kept distinct from [`Propagation::Required`] so callers can express
    /// "transactional if the caller is" at the boundary.
    Supports,

    /// Run non-transactionally, suspending a bound transaction if present.
    NotSupported,

    /// Join the bound transaction; fail if none is bound.
    Mandatory,

    /// Run non-transactionally; fail if a transaction is bound.
    Never,
}

impl Propagation {
    /// Check if this behavior refuses to run without a bound transaction.
    pub fn requires_existing(&self) -> bool {
        matches!(self, Propagation::Mandatory)
    }

    /// Check if this behavior refuses to run inside a bound transaction.
    pub fn forbids_existing(&self) -> bool {
        matches!(self, Propagation::Never)
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Propagation::Required => write!(f, "REQUIRED"),
            Propagation::RequiresNew => write!(f, "REQUIRES_NEW"),
            Propagation::Nested => write!(f, "NESTED"),
            Propagation::Supports => write!(f, "SUPPORTS"),
            Propagation::NotSupported => write!(f, "NOT_SUPPORTED"),
            Propagation::Mandatory => write!(f, "MANDATORY"),
            Propagation::Never => write!(f, "NEVER"),
        }
    }
}

impl std::str::FromStr for Propagation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace([' ', '-'], "_").as_str() {
            "REQUIRED" => Ok(Propagation::Required),
            "REQUIRES_NEW" | "REQUIRESNEW" => Ok(Propagation::RequiresNew),
            "NESTED" => Ok(Propagation::Nested),
            "SUPPORTS" => Ok(Propagation::Supports),
            "NOT_SUPPORTED" | "NOTSUPPORTED" => Ok(Propagation::NotSupported),
            "MANDATORY" => Ok(Propagation::Mandatory),
            "NEVER" => Ok(Propagation::Never),
            _ => Err(format!("unknown propagation behavior: {}", s)),
        }
    }
}

/// Requested completion outcome, dispatched by
/// [`TransactionManager::complete`](crate::transaction::TransactionManager::complete).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Commit,
    Rollback,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Commit => write!(f, "COMMIT"),
            Completion::Rollback => write!(f, "ROLLBACK"),
        }
    }
}
