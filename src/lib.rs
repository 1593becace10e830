//! # xapool
//!
//! Bounded connection pool for transaction processing, with two-phase-commit
//! enlistment tracking.
//!
//! The pool hands out connections created by a [`ConnectionFactory`], reuses
//! them across callers whose credentials match, and keeps a connection out of
//! service while the transaction manager still has an open branch on it.
//!
//! ## Quick Start
//!
//! ```ignore
//! use xapool::prelude::*;
//!
//! let pool = PoolBuilder::new(MyFactory::new())
//!     .name("orders")
//!     .max_connections(16)
//!     .max_idle(Duration::from_secs(300))
//!     .transaction_manager(tm)
//!     .build()?;
//!
//! let conn = pool.allocate(Some(&Credential::new("scott", "tiger")), None)?;
//! conn.execute("update orders ...")?;
//! pool.release(conn, true)?;
//!
//! pool.destroy();
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Allocate** - reuse a matching available connection, create one if
//!    there is room, evict an unmatched one at capacity, or wait
//! 2. **Release** - delist, clean up, and make available (or destroy on
//!    failure); deferred while enlistments are outstanding
//! 3. **Expire** - a sweeper thread destroys connections idle past `max_idle`
//! 4. **Destroy** - every owned connection is destroyed and later allocates fail

#![warn(missing_docs)]

mod builder;

pub mod prelude;

// Re-export main entry points
pub use builder::PoolBuilder;
pub use xapool_engine::{
    AvailableConnection, AvailableConnections, AvailableInfo, ConnectionFactory, ConnectionPool,
    ConnectionState, EnlistmentTracker, PoolMetrics, PooledConnection,
};

// Re-export core types
pub use xapool_core::{
    ConnectionId, Credential, DelistOutcome, EnlistmentListener, Error, Password, PoolConfig,
    PoolId, RequestInfo, Result, TransactionError, TransactionManager, XaResource,
};
