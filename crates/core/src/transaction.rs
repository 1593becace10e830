//! Transaction-manager contract
//!
//! The pool does not run two-phase commit itself. It hands each connection's
//! [`XaResource`] to a [`TransactionManager`] on checkout (enlist) and on
//! return (delist), and receives lifecycle notifications through an
//! [`EnlistmentListener`] so it can tell when a transaction branch is done
//! with a connection.
//!
//! ## Locking
//!
//! The pool never holds its own lock while calling into the transaction
//! manager. A manager may therefore invoke listener callbacks synchronously
//! from inside `enlist` or `delist`.

use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by a transaction manager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// The current transaction can only roll back
    #[error("transaction marked rollback-only: {0}")]
    RollbackOnly(String),

    /// The transaction is not in a state that accepts enlistment/delistment
    #[error("invalid transaction state: {0}")]
    InvalidState(String),

    /// The resource itself reported an XA error
    #[error("resource {resource} failed: {reason}")]
    Resource {
        /// Resource name as reported by [`XaResource::resource_name`]
        resource: String,
        /// Failure description
        reason: String,
    },
}

/// Two-phase-commit resource handle of one underlying connection
///
/// The pool only stores and forwards this handle; it never interprets it.
pub trait XaResource: Send + Sync + Debug {
    /// Name used in log records
    fn resource_name(&self) -> &str;
}

/// Outcome flag passed to [`TransactionManager::delist`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelistOutcome {
    /// The caller finished its work normally
    Success,
    /// The caller hit an error; the branch should roll back
    Fail,
}

impl DelistOutcome {
    /// Map a release `success` flag to an outcome
    pub fn from_success(success: bool) -> Self {
        if success {
            DelistOutcome::Success
        } else {
            DelistOutcome::Fail
        }
    }
}

/// Callbacks the transaction manager fires for one enlisted connection
///
/// Each successful `on_enlist` must eventually be matched by exactly one
/// `on_enlist_failed` or `on_boundary`.
pub trait EnlistmentListener: Send + Sync {
    /// The resource was associated with a transaction branch
    fn on_enlist(&self);

    /// A previously reported enlistment did not complete
    fn on_enlist_failed(&self);

    /// The branch reached its outcome (commit when `committed`, else rollback)
    fn on_boundary(&self, committed: bool);
}

/// Transaction manager as seen by the pool
pub trait TransactionManager: Send + Sync {
    /// Enlist `resource` in the caller's current transaction, if any
    ///
    /// A manager with no active transaction for the caller returns `Ok(())`
    /// without touching `listener`.
    fn enlist(
        &self,
        resource: Arc<dyn XaResource>,
        listener: Arc<dyn EnlistmentListener>,
    ) -> Result<(), TransactionError>;

    /// Dissociate `resource` from the caller's current transaction
    fn delist(
        &self,
        resource: Arc<dyn XaResource>,
        outcome: DelistOutcome,
    ) -> Result<(), TransactionError>;
}
