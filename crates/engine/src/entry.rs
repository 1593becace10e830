//! Pool entries
//!
//! A [`PoolEntry`] pairs one underlying connection with the pool's
//! bookkeeping for it. Entries only change while the pool lock is held.
//!
//! ## States
//!
//! ```text
//!             reserve                    release (no enlistments)
//!  Available ─────────► InUse ─────────────────────────────────► Available
//!      ▲                  │
//!      │                  │ release while enlisted
//!      │                  ▼
//!      └──────── PendingRelease { discard } ──► removed (discard = true)
//!        last enlistment ends
//! ```
//!
//! `since` means "became available at" for available entries and
//! "checked out at" otherwise.

use std::sync::Arc;
use std::time::{Duration, Instant};
use xapool_core::{ConnectionId, Credential, RequestInfo, XaResource};

/// Availability of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryState {
    /// Owned by the pool, may be handed out
    Available,
    /// Connection is held by a caller
    InUse,
    /// Returned by its caller but still enlisted in a transaction branch
    PendingRelease {
        /// Destroy instead of reuse once the last enlistment ends
        discard: bool,
    },
}

/// Public view of an entry's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ConnectionState {
    /// Ready to be allocated
    Available,
    /// Checked out by a caller
    InUse,
    /// Waiting for outstanding enlistments to end
    PendingRelease,
}

impl From<EntryState> for ConnectionState {
    fn from(state: EntryState) -> Self {
        match state {
            EntryState::Available => ConnectionState::Available,
            EntryState::InUse => ConnectionState::InUse,
            EntryState::PendingRelease { .. } => ConnectionState::PendingRelease,
        }
    }
}

/// One pooled connection and its bookkeeping
pub(crate) struct PoolEntry<C> {
    pub(crate) id: ConnectionId,
    pub(crate) state: EntryState,
    pub(crate) since: Instant,
    /// Present while the pool owns the connection (available or pending),
    /// absent while in use or while cleanup runs
    pub(crate) conn: Option<C>,
    pub(crate) xa: Option<Arc<dyn XaResource>>,
    pub(crate) credential: Option<Credential>,
    pub(crate) request_info: Option<RequestInfo>,
    pub(crate) enlistments: u32,
}

impl<C> PoolEntry<C> {
    /// Entry for a freshly created connection handed straight to a caller
    pub(crate) fn in_use(
        id: ConnectionId,
        xa: Option<Arc<dyn XaResource>>,
        credential: Option<Credential>,
        request_info: Option<RequestInfo>,
        now: Instant,
    ) -> Self {
        Self {
            id,
            state: EntryState::InUse,
            since: now,
            conn: None,
            xa,
            credential,
            request_info,
            enlistments: 0,
        }
    }

    /// Entry for a prefilled connection
    pub(crate) fn available(
        id: ConnectionId,
        conn: C,
        xa: Option<Arc<dyn XaResource>>,
        now: Instant,
    ) -> Self {
        Self {
            id,
            state: EntryState::Available,
            since: now,
            conn: Some(conn),
            xa,
            credential: None,
            request_info: None,
            enlistments: 0,
        }
    }

    /// Available and not bound to any transaction branch
    pub(crate) fn is_available(&self) -> bool {
        self.state == EntryState::Available && self.enlistments == 0 && self.conn.is_some()
    }

    /// Take the connection out for a caller
    ///
    /// Returns `None` if the entry cannot be reserved.
    pub(crate) fn reserve(&mut self, now: Instant) -> Option<C> {
        if !self.is_available() {
            return None;
        }
        self.state = EntryState::InUse;
        self.since = now;
        self.conn.take()
    }

    /// How long the entry has been in its current state
    pub(crate) fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.since)
    }

    /// When an available entry becomes eligible for expiration
    pub(crate) fn expires_at(&self, max_idle: Duration) -> Option<Instant> {
        if self.state == EntryState::Available {
            self.since.checked_add(max_idle)
        } else {
            None
        }
    }

    /// User name of the stored credential, for logs
    pub(crate) fn user(&self) -> Option<&str> {
        self.credential.as_ref().map(|c| c.user.as_str())
    }
}
