//! Client handle for a checked-out connection

use crate::factory::ConnectionFactory;
use crate::pool::Shared;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use xapool_core::{ConnectionId, Credential, PoolId, XaResource};

/// A connection allocated from a [`ConnectionPool`](crate::ConnectionPool)
///
/// Derefs to the underlying connection. Give it back with
/// [`ConnectionPool::release`](crate::ConnectionPool::release) or
/// [`ConnectionPool::discard`](crate::ConnectionPool::discard). A handle
/// dropped without either is released as a failure, so the connection is
/// destroyed rather than reused.
///
/// The handle keeps the pool's shared state alive, so a connection that
/// outlives its [`ConnectionPool`](crate::ConnectionPool) still reaches
/// the adapter's `destroy` when the handle goes away.
pub struct PooledConnection<F: ConnectionFactory> {
    pool: Arc<Shared<F>>,
    pool_id: PoolId,
    id: ConnectionId,
    conn: Option<F::Connection>,
    xa: Option<Arc<dyn XaResource>>,
    credential: Option<Credential>,
    checked_out_at: Instant,
}

/// Parts of a handle needed to give the connection back
pub(crate) type Returned<C> = (ConnectionId, C, Option<Arc<dyn XaResource>>, Instant);

impl<F: ConnectionFactory> PooledConnection<F> {
    pub(crate) fn new(
        pool: Arc<Shared<F>>,
        pool_id: PoolId,
        id: ConnectionId,
        conn: F::Connection,
        xa: Option<Arc<dyn XaResource>>,
        credential: Option<Credential>,
        checked_out_at: Instant,
    ) -> Self {
        Self {
            pool,
            pool_id,
            id,
            conn: Some(conn),
            xa,
            credential,
            checked_out_at,
        }
    }

    /// Identity of the pooled connection
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Pool this connection was allocated from
    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// Credential the connection was allocated for
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Two-phase-commit handle, if the connection takes part in 2PC
    pub fn xa_resource(&self) -> Option<&Arc<dyn XaResource>> {
        self.xa.as_ref()
    }

    /// When the connection was handed out
    pub fn checked_out_at(&self) -> Instant {
        self.checked_out_at
    }

    /// How long the connection has been checked out
    pub fn held_for(&self) -> Duration {
        self.checked_out_at.elapsed()
    }

    pub(crate) fn take(&mut self) -> Option<Returned<F::Connection>> {
        let conn = self.conn.take()?;
        Some((self.id, conn, self.xa.clone(), self.checked_out_at))
    }
}

impl<F: ConnectionFactory> std::ops::Deref for PooledConnection<F> {
    type Target = F::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_ref()
            .expect("connection already returned to pool")
    }
}

impl<F: ConnectionFactory> std::ops::DerefMut for PooledConnection<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_mut()
            .expect("connection already returned to pool")
    }
}

impl<F: ConnectionFactory> Drop for PooledConnection<F> {
    fn drop(&mut self) {
        let Some((id, conn, xa, checked_out_at)) = self.take() else {
            return;
        };
        warn!(
            pool = %self.pool.config.name,
            connection = %id,
            user = self.credential.as_ref().map(|c| c.user.as_str()),
            "connection dropped without release, discarding"
        );
        if let Err(e) = self
            .pool
            .release_connection(id, conn, xa, checked_out_at, false, false)
        {
            debug!(pool = %self.pool.config.name, connection = %id, error = %e, "release on drop failed");
        }
    }
}

impl<F: ConnectionFactory> std::fmt::Debug for PooledConnection<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("pool_id", &self.pool_id)
            .field("user", &self.credential.as_ref().map(|c| &c.user))
            .field("held_for", &self.held_for())
            .finish_non_exhaustive()
    }
}
