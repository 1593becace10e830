//! Connection factory adapter
//!
//! The pool never touches a concrete resource type directly. Everything it
//! needs from a driver goes through [`ConnectionFactory`]:
//!
//! | Hook | When | Lock held |
//! |------|------|-----------|
//! | `create` | no reusable connection and capacity left | no |
//! | `match_existing` | every allocate with available connections | yes |
//! | `connection_handle` | before a connection is handed to a caller | no |
//! | `xa_resource` | once, right after `create` | no |
//! | `cleanup` | successful release once no enlistment is open, before reuse | no |
//! | `destroy` | discard, expiration, pool destruction | no |
//!
//! `match_existing` runs under the pool lock and must not call back into the
//! pool.
//!
//! An `AdapterContractViolation` from `create` or `connection_handle`, or a
//! `match_existing` that names a connection which is not available, destroys
//! the pool. Later allocations fail with `PoolDestroyed`.

use crate::available::AvailableConnections;
use std::sync::Arc;
use xapool_core::{ConnectionId, Credential, RequestInfo, Result, XaResource};

/// Adapter between the pool and one kind of underlying connection
///
/// Implementations report creation failures as
/// [`Error::ResourceCreationFailed`](xapool_core::Error::ResourceCreationFailed)
/// and type or configuration mismatches as
/// [`Error::AdapterContractViolation`](xapool_core::Error::AdapterContractViolation).
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Underlying connection type
    type Connection: Send + 'static;

    /// Open a new underlying connection
    fn create(
        &self,
        credential: Option<&Credential>,
        request_info: Option<&RequestInfo>,
    ) -> Result<Self::Connection>;

    /// Pick an available connection that can serve this caller
    ///
    /// Returning an id that is not in `available` is a contract violation.
    /// The default matches on equal credential and request info.
    fn match_existing(
        &self,
        available: &AvailableConnections<'_, Self::Connection>,
        credential: Option<&Credential>,
        request_info: Option<&RequestInfo>,
    ) -> Option<ConnectionId> {
        available
            .iter()
            .find(|c| c.credential() == credential && c.request_info() == request_info)
            .map(|c| c.id())
    }

    /// Prepare a connection for the caller that is about to receive it
    fn connection_handle(
        &self,
        _conn: &mut Self::Connection,
        _credential: Option<&Credential>,
    ) -> Result<()> {
        Ok(())
    }

    /// Two-phase-commit handle of a connection, if it takes part in 2PC
    fn xa_resource(&self, _conn: &Self::Connection) -> Option<Arc<dyn XaResource>> {
        None
    }

    /// Reset per-caller state before the connection is reused
    fn cleanup(&self, _conn: &mut Self::Connection) -> Result<()> {
        Ok(())
    }

    /// Close an underlying connection
    fn destroy(&self, conn: Self::Connection);
}

impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    type Connection = T::Connection;

    fn create(
        &self,
        credential: Option<&Credential>,
        request_info: Option<&RequestInfo>,
    ) -> Result<Self::Connection> {
        (**self).create(credential, request_info)
    }

    fn match_existing(
        &self,
        available: &AvailableConnections<'_, Self::Connection>,
        credential: Option<&Credential>,
        request_info: Option<&RequestInfo>,
    ) -> Option<ConnectionId> {
        (**self).match_existing(available, credential, request_info)
    }

    fn connection_handle(
        &self,
        conn: &mut Self::Connection,
        credential: Option<&Credential>,
    ) -> Result<()> {
        (**self).connection_handle(conn, credential)
    }

    fn xa_resource(&self, conn: &Self::Connection) -> Option<Arc<dyn XaResource>> {
        (**self).xa_resource(conn)
    }

    fn cleanup(&self, conn: &mut Self::Connection) -> Result<()> {
        (**self).cleanup(conn)
    }

    fn destroy(&self, conn: Self::Connection) {
        (**self).destroy(conn)
    }
}
