//! Error types for the pool
//!
//! One enum covers every failure the pool reports to callers:
//!
//! | Variant | Meaning | Caller action |
//! |---------|---------|---------------|
//! | ResourceExhausted | allocate timed out at capacity | retry later |
//! | ResourceCreationFailed | adapter could not open a connection | surface |
//! | AdapterContractViolation | adapter returned something the pool cannot use | fix configuration |
//! | EnlistmentFailed | transaction manager refused the connection | surface |
//! | InternalPoolError | invariant violation, operation ignored | report bug |
//! | PoolDestroyed | pool already shut down | stop using the pool |
//! | InvalidConfig / Config | bad configuration input | fix configuration |

use std::time::Duration;
use thiserror::Error;

/// All pool errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No connection became available before the allocation timeout expired
    #[error("resource exhausted: no connection available after {waited:?} (maximum {maximum})")]
    ResourceExhausted {
        /// How long the caller waited
        waited: Duration,
        /// Configured maximum pool size
        maximum: usize,
    },

    /// The factory adapter failed to create an underlying connection
    #[error("connection creation failed: {0}")]
    ResourceCreationFailed(String),

    /// The factory adapter broke its contract (wrong type, unknown id, ...)
    #[error("adapter contract violation: {0}")]
    AdapterContractViolation(String),

    /// The transaction manager could not enlist the connection
    #[error("enlistment failed: {0}")]
    EnlistmentFailed(String),

    /// Internal invariant violation (bug or caller misuse)
    #[error("internal pool error: {0}")]
    InternalPoolError(String),

    /// Operation attempted after the pool was destroyed
    #[error("pool destroyed")]
    PoolDestroyed,

    /// Configuration values are inconsistent
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Only exhaustion is transient: a later allocate may find a free slot.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ResourceExhausted { .. })
    }

    /// Check if the pool instance can no longer serve requests.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::AdapterContractViolation(_) | Error::PoolDestroyed
        )
    }

    /// Check if this is an internal invariant violation.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::InternalPoolError(_))
    }
}

impl From<crate::transaction::TransactionError> for Error {
    fn from(e: crate::transaction::TransactionError) -> Self {
        Error::EnlistmentFailed(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
