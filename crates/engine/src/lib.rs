//! Pool engine for xapool
//!
//! This crate implements the bounded connection pool with:
//! - ConnectionPool: allocate, release, discard, expire and destroy
//! - ConnectionFactory: the adapter between the pool and a concrete driver
//! - EnlistmentTracker: deferred release while a 2PC branch is still open
//! - A background sweeper that expires idle connections

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod available;
pub mod enlistment;
pub mod entry;
pub mod factory;
pub mod handle;
pub mod metrics;
pub mod pool;
mod sweeper;

pub use available::{AvailableConnection, AvailableConnections, AvailableInfo};
pub use enlistment::EnlistmentTracker;
pub use entry::ConnectionState;
pub use factory::ConnectionFactory;
pub use handle::PooledConnection;
pub use metrics::PoolMetrics;
pub use pool::ConnectionPool;

// Re-export core types for convenience
pub use xapool_core::{
    ConnectionId, Credential, Error, PoolConfig, PoolId, RequestInfo, Result, TransactionManager,
    XaResource,
};
