//! Enlistment tracking
//!
//! Application code may release a connection while the transaction manager
//! is still finishing two-phase commit on its resource handle. Each entry
//! therefore counts its outstanding enlistments, and a release that arrives
//! while the count is nonzero only parks the entry
//! (`EntryState::PendingRelease`). The entry becomes available, or is
//! destroyed, when the last enlistment ends. The adapter's cleanup is
//! deferred with it, so a connection is never reset while a branch on its
//! resource is still open.
//!
//! ```text
//! allocate ──► enlist(+1) ──► release ──► PendingRelease ──► boundary(-1) ──► Available
//! ```
//!
//! The count and the entry state are both guarded by the pool lock, so
//! "is this entry safe to reuse" and "is this entry available" are decided
//! together.

use crate::entry::EntryState;
use crate::factory::ConnectionFactory;
use crate::pool::Shared;
use std::sync::Weak;
use std::time::Instant;
use tracing::{debug, error, warn};
use xapool_core::{ConnectionId, EnlistmentListener};

/// Listener handed to the transaction manager for one connection
///
/// Holds only a weak reference: callbacks that arrive after the pool is gone
/// are ignored.
pub struct EnlistmentTracker<F: ConnectionFactory> {
    pool: Weak<Shared<F>>,
    id: ConnectionId,
}

impl<F: ConnectionFactory> EnlistmentTracker<F> {
    pub(crate) fn new(pool: Weak<Shared<F>>, id: ConnectionId) -> Self {
        Self { pool, id }
    }

    /// Connection this tracker reports on
    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }
}

impl<F: ConnectionFactory> EnlistmentListener for EnlistmentTracker<F> {
    fn on_enlist(&self) {
        if let Some(shared) = self.pool.upgrade() {
            shared.begin_enlistment(self.id);
        }
    }

    fn on_enlist_failed(&self) {
        if let Some(shared) = self.pool.upgrade() {
            shared.end_enlistment(self.id, "enlist failed");
        }
    }

    fn on_boundary(&self, committed: bool) {
        if let Some(shared) = self.pool.upgrade() {
            let reason = if committed { "committed" } else { "rolled back" };
            shared.end_enlistment(self.id, reason);
        }
    }
}

impl<F: ConnectionFactory> std::fmt::Debug for EnlistmentTracker<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnlistmentTracker")
            .field("connection", &self.id)
            .finish()
    }
}

impl<F: ConnectionFactory> Shared<F> {
    pub(crate) fn begin_enlistment(&self, id: ConnectionId) {
        let mut state = self.state.lock();
        if !state.entries.contains_key(&id) {
            drop(state);
            warn!(pool = %self.config.name, connection = %id, "enlistment of unknown connection ignored");
            return;
        }
        let Some(entry) = state.entries.get_mut(&id) else {
            return;
        };
        entry.enlistments += 1;
        let enlistments = entry.enlistments;
        let was_available = entry.state == EntryState::Available;
        if was_available {
            // Enlisted after release: keep it out of service until the branch ends.
            entry.state = EntryState::PendingRelease { discard: false };
            state.available -= 1;
        }
        drop(state);

        if was_available {
            warn!(
                pool = %self.config.name,
                connection = %id,
                "available connection enlisted, withholding until transaction ends"
            );
        } else if self.trace() {
            debug!(pool = %self.config.name, connection = %id, enlistments, "enlisted");
        }
    }

    pub(crate) fn end_enlistment(&self, id: ConnectionId, reason: &'static str) {
        let mut state = self.state.lock();
        if !state.entries.contains_key(&id) {
            drop(state);
            debug!(
                pool = %self.config.name,
                connection = %id,
                reason,
                "enlistment ended for connection no longer in pool"
            );
            return;
        }
        let Some(entry) = state.entries.get_mut(&id) else {
            return;
        };

        if entry.enlistments == 0 {
            error!(
                pool = %self.config.name,
                connection = %id,
                reason,
                user = entry.user(),
                "enlistment count would go negative, clamping to zero"
            );
        } else {
            entry.enlistments -= 1;
        }

        if entry.enlistments > 0 {
            return;
        }
        let EntryState::PendingRelease { discard } = entry.state else {
            return;
        };

        if self.trace() {
            debug!(pool = %self.config.name, connection = %id, reason, discard, "deferred release completing");
        }
        if discard {
            self.finish_release(state, id, false, Instant::now());
            return;
        }
        // No connection means a cleanup from an earlier boundary is still running.
        let Some(conn) = entry.conn.take() else {
            return;
        };
        drop(state);
        self.clean_and_finish(id, conn);
    }
}
