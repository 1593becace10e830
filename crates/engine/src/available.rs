//! Read-only views of the available connections
//!
//! [`AvailableConnections`] is what a [`ConnectionFactory`](crate::ConnectionFactory)
//! sees when asked to match a caller against pooled connections. It borrows
//! the pool state, so it only exists while the pool lock is held.
//! [`AvailableInfo`] is the owned snapshot handed to administrative tooling.

use crate::entry::PoolEntry;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::time::{Duration, Instant};
use xapool_core::{ConnectionId, Credential, RequestInfo};

/// Set-like view of the connections that can be allocated right now
pub struct AvailableConnections<'a, C> {
    entries: &'a FxHashMap<ConnectionId, PoolEntry<C>>,
    now: Instant,
}

impl<'a, C: 'a> AvailableConnections<'a, C> {
    pub(crate) fn new(entries: &'a FxHashMap<ConnectionId, PoolEntry<C>>, now: Instant) -> Self {
        Self { entries, now }
    }

    /// Iterate available connections in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = AvailableConnection<'a, C>> + 'a {
        let entries: &'a FxHashMap<ConnectionId, PoolEntry<C>> = self.entries;
        let now = self.now;
        entries
            .values()
            .filter(|entry| entry.is_available())
            .filter_map(move |entry| {
                entry.conn.as_ref().map(|conn| AvailableConnection {
                    entry,
                    conn,
                    now,
                })
            })
    }

    /// Check whether `id` is currently available
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries
            .get(&id)
            .map_or(false, |entry| entry.is_available())
    }

    /// Number of available connections
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Check if nothing is available
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// One available connection inside an [`AvailableConnections`] view
pub struct AvailableConnection<'a, C> {
    entry: &'a PoolEntry<C>,
    conn: &'a C,
    now: Instant,
}

impl<'a, C> AvailableConnection<'a, C> {
    /// Identity of the connection
    pub fn id(&self) -> ConnectionId {
        self.entry.id
    }

    /// The underlying connection
    pub fn connection(&self) -> &'a C {
        self.conn
    }

    /// Credential the connection was opened with
    pub fn credential(&self) -> Option<&'a Credential> {
        self.entry.credential.as_ref()
    }

    /// Request info the connection was opened with
    pub fn request_info(&self) -> Option<&'a RequestInfo> {
        self.entry.request_info.as_ref()
    }

    /// How long the connection has been idle
    pub fn idle_for(&self) -> Duration {
        self.entry.age(self.now)
    }
}

/// Owned description of an available connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableInfo {
    /// Identity of the connection
    pub id: ConnectionId,
    /// User of the credential the connection was opened with
    pub user: Option<String>,
    /// How long the connection has been idle
    pub idle_for: Duration,
}

impl AvailableInfo {
    pub(crate) fn collect<C>(
        entries: &FxHashMap<ConnectionId, PoolEntry<C>>,
        now: Instant,
    ) -> Vec<AvailableInfo> {
        let mut infos: Vec<AvailableInfo> = AvailableConnections::new(entries, now)
            .iter()
            .map(|c| AvailableInfo {
                id: c.id(),
                user: c.credential().map(|cred| cred.user.clone()),
                idle_for: c.idle_for(),
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }
}
