//! Pool Integration Tests
//!
//! Drives the public API with a counting factory and a recording transaction
//! manager.
//!
//! ## Key Verification Points
//!
//! 1. The pool never tracks more than `max_connections`
//! 2. A connection is never held by two callers at once
//! 3. Release of an enlisted connection waits for the transaction boundary
//! 4. Failed releases destroy the connection
//! 5. Allocate gives up after the configured timeout
//! 6. Idle connections expire in the background
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test pool
//! cargo test --test pool enlistment::
//! ```

#[path = "../common/mod.rs"]
mod common;

mod capacity;
mod errors;
mod expiration;
mod matching;
