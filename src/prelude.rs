//! Convenient imports for xapool.
//!
//! ```ignore
//! use xapool::prelude::*;
//!
//! let pool = PoolBuilder::new(MyFactory::new()).max_connections(4).build()?;
//! ```

// Main entry points
pub use crate::builder::PoolBuilder;
pub use xapool_engine::{ConnectionFactory, ConnectionPool, PooledConnection};

// Error handling
pub use xapool_core::{Error, Result};

// Caller identity
pub use xapool_core::{ConnectionId, Credential, RequestInfo};

// Transaction manager contract
pub use xapool_core::{DelistOutcome, EnlistmentListener, TransactionManager, XaResource};

// Re-export Duration for builder settings
pub use std::time::Duration;
