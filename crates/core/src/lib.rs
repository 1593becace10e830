//! Core types for xapool
//!
//! This crate holds everything the pool engine shares with its collaborators:
//! - [`Error`]: the pool error taxonomy
//! - [`PoolConfig`]: read-only pool settings, loadable from TOML
//! - [`types`]: connection identity and caller credentials
//! - [`transaction`]: the contract the pool requires from a transaction manager

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod transaction;
pub mod types;

pub use config::PoolConfig;
pub use error::{Error, Result};
pub use transaction::{
    DelistOutcome, EnlistmentListener, TransactionError, TransactionManager, XaResource,
};
pub use types::{ConnectionId, Credential, Password, PoolId, RequestInfo};
