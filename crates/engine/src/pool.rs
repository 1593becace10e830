//! Connection pool engine
//!
//! All pool state lives in one [`PoolState`] behind one mutex. Blocked
//! allocators wait on a condition variable that is broadcast on every state
//! change (release, discard, expiration, destruction), so each waiter
//! re-runs the full allocate loop. There is no FIFO ordering among waiters.
//!
//! ## Allocate
//!
//! ```text
//! loop {
//!   destroyed?                      -> PoolDestroyed
//!   adapter matches available entry -> reserve it, hand it out
//!   capacity left                   -> reserve a creation slot, create outside the lock
//!   at capacity, unmatched entry    -> evict it, create in its slot
//!   timeout left                    -> wait (lock released), retry
//!   otherwise                       -> ResourceExhausted
//! }
//! ```
//!
//! Creation slots count against `max_connections` while the adapter is
//! opening a connection, so the maximum holds even though creation happens
//! without the lock.
//!
//! ## Release
//!
//! The transaction manager delist runs without the lock. Back under the lock
//! the connection is destroyed (error release), parked until its last
//! enlistment ends (see [`crate::enlistment`]), or cleaned by the adapter
//! and made available. Cleanup runs without the lock and only once no
//! enlistment is outstanding.
//!
//! An `AdapterContractViolation` from the adapter destroys the pool.

use crate::available::{AvailableConnections, AvailableInfo};
use crate::enlistment::EnlistmentTracker;
use crate::entry::{ConnectionState, EntryState, PoolEntry};
use crate::factory::ConnectionFactory;
use crate::handle::PooledConnection;
use crate::metrics::{Counters, PoolMetrics};
use crate::sweeper::Sweeper;
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use xapool_core::{
    ConnectionId, Credential, DelistOutcome, EnlistmentListener, Error, PoolConfig, PoolId,
    RequestInfo, Result, TransactionManager, XaResource,
};

/// Mutable pool state, guarded by [`Shared::state`]
pub(crate) struct PoolState<C> {
    pub(crate) entries: FxHashMap<ConnectionId, PoolEntry<C>>,
    next_id: u64,
    /// Entries in `EntryState::Available`
    pub(crate) available: usize,
    /// Connections being created outside the lock
    pending_creates: usize,
    waiting: usize,
    pub(crate) next_expiration: Option<Instant>,
    pub(crate) destroyed: bool,
    pub(crate) counters: Counters,
}

impl<C> PoolState<C> {
    fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            next_id: 1,
            available: 0,
            pending_creates: 0,
            waiting: 0,
            next_expiration: None,
            destroyed: false,
            counters: Counters::default(),
        }
    }

    fn allocate_id(&mut self) -> ConnectionId {
        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Connections tracked, excluding ones still being created
    pub(crate) fn total(&self) -> usize {
        self.entries.len()
    }

    fn has_capacity(&self, max_connections: usize) -> bool {
        max_connections == 0 || self.entries.len() + self.pending_creates < max_connections
    }

    fn insert(&mut self, entry: PoolEntry<C>) {
        if entry.state == EntryState::Available {
            self.available += 1;
        }
        self.entries.insert(entry.id, entry);
        let total = self.entries.len();
        self.counters.observe_total(total);
    }

    /// Reserve an available entry, returning its connection and 2PC handle
    fn reserve(
        &mut self,
        id: ConnectionId,
        now: Instant,
    ) -> Option<(C, Option<Arc<dyn XaResource>>)> {
        let entry = self.entries.get_mut(&id)?;
        let idle = entry.age(now);
        let conn = entry.reserve(now)?;
        let xa = entry.xa.clone();
        self.available -= 1;
        self.counters.record_unused(idle);
        Some((conn, xa))
    }

    /// Mark an entry available, returning true if the next expiration moved earlier
    pub(crate) fn make_available(
        &mut self,
        id: ConnectionId,
        now: Instant,
        max_idle: Option<Duration>,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        if entry.state == EntryState::Available {
            return false;
        }
        entry.state = EntryState::Available;
        entry.since = now;
        self.available += 1;

        let Some(expires_at) = max_idle.and_then(|d| now.checked_add(d)) else {
            return false;
        };
        match self.next_expiration {
            Some(current) if current <= expires_at => false,
            _ => {
                self.next_expiration = Some(expires_at);
                true
            }
        }
    }

    /// Remove an entry from the table, keeping the available count in step
    pub(crate) fn remove(&mut self, id: ConnectionId) -> Option<PoolEntry<C>> {
        let entry = self.entries.remove(&id)?;
        if entry.state == EntryState::Available {
            self.available -= 1;
        }
        Some(entry)
    }

    /// First available entry found in a table scan
    ///
    /// The choice among available entries is unspecified (not LRU).
    fn eviction_candidate(&self) -> Option<ConnectionId> {
        self.entries
            .values()
            .find(|entry| entry.is_available())
            .map(|entry| entry.id)
    }

    pub(crate) fn recompute_next_expiration(&mut self, max_idle: Option<Duration>) {
        self.next_expiration = max_idle.and_then(|d| {
            self.entries
                .values()
                .filter_map(|entry| entry.expires_at(d))
                .min()
        });
    }

    fn count_state(&self, f: impl Fn(EntryState) -> bool) -> usize {
        self.entries.values().filter(|entry| f(entry.state)).count()
    }
}

/// State shared between the pool handle, client handles, enlistment
/// trackers and the sweeper
pub(crate) struct Shared<F: ConnectionFactory> {
    pub(crate) id: PoolId,
    pub(crate) config: PoolConfig,
    pub(crate) factory: F,
    pub(crate) transaction_manager: Option<Arc<dyn TransactionManager>>,
    pub(crate) state: Mutex<PoolState<F::Connection>>,
    /// Broadcast on every change that may let a blocked allocator proceed
    pub(crate) changed: Condvar,
    /// Wakes the sweeper when the next expiration moves earlier or the pool stops
    pub(crate) sweeper_wake: Condvar,
}

impl<F: ConnectionFactory> Shared<F> {
    pub(crate) fn trace(&self) -> bool {
        self.config.trace
    }

    fn allocate(
        self: &Arc<Self>,
        credential: Option<&Credential>,
        request_info: Option<&RequestInfo>,
        timeout: Duration,
    ) -> Result<PooledConnection<F>> {
        let start = Instant::now();
        let deadline = start.checked_add(timeout);
        let user = credential.map(|c| c.user.as_str());
        let mut state = self.state.lock();

        loop {
            if state.destroyed {
                return Err(Error::PoolDestroyed);
            }

            if state.available > 0 {
                let now = Instant::now();
                let matched = {
                    let view = AvailableConnections::new(&state.entries, now);
                    self.factory.match_existing(&view, credential, request_info)
                };
                if let Some(id) = matched {
                    let Some((conn, xa)) = state.reserve(id, now) else {
                        state.counters.errors += 1;
                        drop(state);
                        error!(
                            pool = %self.config.name,
                            connection = %id,
                            user,
                            "adapter matched a connection that is not available"
                        );
                        let e = Error::AdapterContractViolation(format!(
                            "matched connection {} is not available",
                            id
                        ));
                        self.on_adapter_error(&e);
                        return Err(e);
                    };
                    drop(state);
                    if self.trace() {
                        debug!(pool = %self.config.name, connection = %id, user, "reusing connection");
                    }
                    return self.checkout(id, conn, xa, credential, now);
                }
            }

            if state.has_capacity(self.config.max_connections) {
                state.pending_creates += 1;
                drop(state);
                return self.create_and_checkout(credential, request_info);
            }

            if let Some(victim) = state.eviction_candidate() {
                let evicted = state.remove(victim);
                state.counters.discarded += 1;
                state.pending_creates += 1;
                state.recompute_next_expiration(self.config.max_idle());
                drop(state);
                if self.trace() {
                    debug!(
                        pool = %self.config.name,
                        connection = %victim,
                        user,
                        "evicting unmatched connection to make room"
                    );
                }
                if let Some(conn) = evicted.and_then(|entry| entry.conn) {
                    self.factory.destroy(conn);
                }
                return self.create_and_checkout(credential, request_info);
            }

            let now = Instant::now();
            let timed_out = match deadline {
                Some(deadline) => now >= deadline,
                None => false,
            };
            if timeout.is_zero() || timed_out {
                state.counters.timeouts += 1;
                let waited = now.saturating_duration_since(start);
                warn!(
                    pool = %self.config.name,
                    user,
                    waited_ms = waited.as_millis() as u64,
                    "no connection available"
                );
                return Err(Error::ResourceExhausted {
                    waited,
                    maximum: self.config.max_connections,
                });
            }

            state.waiting += 1;
            match deadline {
                Some(deadline) => {
                    self.changed.wait_until(&mut state, deadline);
                }
                None => self.changed.wait(&mut state),
            }
            state.waiting -= 1;
        }
    }

    /// Create a connection in a slot already reserved by the caller
    fn create_and_checkout(
        self: &Arc<Self>,
        credential: Option<&Credential>,
        request_info: Option<&RequestInfo>,
    ) -> Result<PooledConnection<F>> {
        let user = credential.map(|c| c.user.as_str());
        let conn = match self.factory.create(credential, request_info) {
            Ok(conn) => conn,
            Err(e) => {
                {
                    let mut state = self.state.lock();
                    state.pending_creates -= 1;
                    state.counters.errors += 1;
                }
                self.changed.notify_all();
                warn!(pool = %self.config.name, user, error = %e, "connection creation failed");
                self.on_adapter_error(&e);
                return Err(e);
            }
        };
        let xa = self.factory.xa_resource(&conn);
        let now = Instant::now();

        let mut state = self.state.lock();
        state.pending_creates -= 1;
        if state.destroyed {
            drop(state);
            self.factory.destroy(conn);
            return Err(Error::PoolDestroyed);
        }
        let id = state.allocate_id();
        state.insert(PoolEntry::in_use(
            id,
            xa.clone(),
            credential.cloned(),
            request_info.cloned(),
            now,
        ));
        state.counters.created += 1;
        drop(state);

        if self.trace() {
            debug!(pool = %self.config.name, connection = %id, user, "created connection");
        }
        self.checkout(id, conn, xa, credential, now)
    }

    /// An adapter that breaks its contract leaves the pool unusable
    fn on_adapter_error(&self, e: &Error) {
        if matches!(e, Error::AdapterContractViolation(_)) {
            error!(pool = %self.config.name, error = %e, "adapter contract violated, destroying pool");
            self.destroy();
        }
    }

    /// Hand a reserved connection to the caller, enlisting it if needed
    fn checkout(
        self: &Arc<Self>,
        id: ConnectionId,
        mut conn: F::Connection,
        xa: Option<Arc<dyn XaResource>>,
        credential: Option<&Credential>,
        checked_out_at: Instant,
    ) -> Result<PooledConnection<F>> {
        let user = credential.map(|c| c.user.as_str());

        if let Err(e) = self.factory.connection_handle(&mut conn, credential) {
            error!(
                pool = %self.config.name,
                connection = %id,
                user,
                error = %e,
                "adapter could not prepare connection, discarding"
            );
            if let Err(release) = self.return_connection(id, conn, checked_out_at, false, true) {
                debug!(pool = %self.config.name, connection = %id, error = %release, "discard after failed checkout");
            }
            self.on_adapter_error(&e);
            return Err(e);
        }

        if let (Some(tm), Some(xa)) = (&self.transaction_manager, &xa) {
            let listener: Arc<dyn EnlistmentListener> =
                Arc::new(EnlistmentTracker::new(Arc::downgrade(self), id));
            if let Err(e) = tm.enlist(Arc::clone(xa), listener) {
                warn!(
                    pool = %self.config.name,
                    connection = %id,
                    user,
                    resource = xa.resource_name(),
                    error = %e,
                    "enlistment failed, discarding connection"
                );
                if let Err(release) = self.return_connection(id, conn, checked_out_at, false, true) {
                    debug!(pool = %self.config.name, connection = %id, error = %release, "discard after failed enlistment");
                }
                return Err(e.into());
            }
        }

        Ok(PooledConnection::new(
            Arc::clone(self),
            self.id,
            id,
            conn,
            xa,
            credential.cloned(),
            checked_out_at,
        ))
    }

    /// Release path shared by explicit release, discard and handle drop
    pub(crate) fn release_connection(
        &self,
        id: ConnectionId,
        conn: F::Connection,
        xa: Option<Arc<dyn XaResource>>,
        checked_out_at: Instant,
        success: bool,
        discard: bool,
    ) -> Result<()> {
        let mut keep = success && !discard;

        if let (Some(tm), Some(xa)) = (&self.transaction_manager, &xa) {
            if let Err(e) = tm.delist(Arc::clone(xa), DelistOutcome::from_success(success)) {
                warn!(
                    pool = %self.config.name,
                    connection = %id,
                    resource = xa.resource_name(),
                    error = %e,
                    "delist failed, connection will be discarded"
                );
                keep = false;
            }
        }

        let count_error = !keep && !discard;
        self.return_connection(id, conn, checked_out_at, keep, count_error)
    }

    /// Put a checked-out connection back under pool ownership
    fn return_connection(
        &self,
        id: ConnectionId,
        conn: F::Connection,
        checked_out_at: Instant,
        keep: bool,
        count_error: bool,
    ) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state
            .counters
            .record_used(now.saturating_duration_since(checked_out_at));
        if count_error {
            state.counters.errors += 1;
        }

        if state.destroyed {
            drop(state);
            self.factory.destroy(conn);
            return Ok(());
        }

        let current = state.entries.get(&id).map(|entry| entry.state);
        match current {
            Some(EntryState::InUse) => {}
            Some(other) => {
                drop(state);
                error!(
                    pool = %self.config.name,
                    connection = %id,
                    state = ?other,
                    "release of connection that is not in use"
                );
                self.factory.destroy(conn);
                return Err(Error::InternalPoolError(format!(
                    "release of connection {} in state {:?}",
                    id, other
                )));
            }
            None => {
                drop(state);
                error!(pool = %self.config.name, connection = %id, "release of unknown connection");
                self.factory.destroy(conn);
                return Err(Error::InternalPoolError(format!(
                    "release of unknown connection {}",
                    id
                )));
            }
        }

        let Some(entry) = state.entries.get_mut(&id) else {
            return Ok(());
        };
        if entry.enlistments > 0 {
            self.park(entry, conn, !keep);
            return Ok(());
        }
        if !keep {
            entry.conn = Some(conn);
            self.finish_release(state, id, false, now);
            return Ok(());
        }

        // The entry stays in use with no connection while cleanup runs.
        drop(state);
        self.clean_and_finish(id, conn);
        Ok(())
    }

    /// Hold a released connection until the entry's enlistments end
    fn park(&self, entry: &mut PoolEntry<F::Connection>, conn: F::Connection, discard: bool) {
        entry.conn = Some(conn);
        entry.state = EntryState::PendingRelease { discard };
        if self.trace() {
            debug!(
                pool = %self.config.name,
                connection = %entry.id,
                enlistments = entry.enlistments,
                discard,
                "release deferred until enlistments end"
            );
        }
    }

    /// Reset a successfully released connection and make it available
    ///
    /// Called without the lock, once the entry has no enlistments and its
    /// connection has been taken out of the table. A cleanup failure discards
    /// the connection. If the entry was enlisted again while cleanup ran, the
    /// connection is parked until that enlistment ends.
    pub(crate) fn clean_and_finish(&self, id: ConnectionId, mut conn: F::Connection) {
        let mut keep = true;
        if let Err(e) = self.factory.cleanup(&mut conn) {
            warn!(
                pool = %self.config.name,
                connection = %id,
                error = %e,
                "cleanup failed, connection will be discarded"
            );
            keep = false;
        }

        let now = Instant::now();
        let mut state = self.state.lock();
        if !keep {
            state.counters.errors += 1;
        }
        if state.destroyed {
            drop(state);
            self.factory.destroy(conn);
            return;
        }
        if !state.entries.contains_key(&id) {
            drop(state);
            error!(pool = %self.config.name, connection = %id, "cleaned connection has no entry");
            self.factory.destroy(conn);
            return;
        }
        let Some(entry) = state.entries.get_mut(&id) else {
            return;
        };
        if entry.enlistments > 0 {
            self.park(entry, conn, !keep);
            return;
        }
        entry.conn = Some(conn);
        self.finish_release(state, id, keep, now);
    }

    /// Complete a release for an entry with no outstanding enlistments
    ///
    /// Consumes the guard so the connection can be destroyed without the lock.
    pub(crate) fn finish_release(
        &self,
        mut state: parking_lot::MutexGuard<'_, PoolState<F::Connection>>,
        id: ConnectionId,
        keep: bool,
        now: Instant,
    ) {
        if keep {
            let earlier = state.make_available(id, now, self.config.max_idle());
            drop(state);
            if earlier {
                self.sweeper_wake.notify_one();
            }
            self.changed.notify_all();
            if self.trace() {
                debug!(pool = %self.config.name, connection = %id, "connection available");
            }
            return;
        }

        let removed = state.remove(id);
        state.counters.discarded += 1;
        drop(state);
        self.changed.notify_all();
        if self.trace() {
            debug!(pool = %self.config.name, connection = %id, "connection discarded");
        }
        if let Some(conn) = removed.and_then(|entry| entry.conn) {
            self.factory.destroy(conn);
        }
    }

    fn discard_available(&self, id: ConnectionId) -> Result<()> {
        let mut state = self.state.lock();
        let Some(current) = state.entries.get(&id).map(|entry| entry.state) else {
            drop(state);
            error!(pool = %self.config.name, connection = %id, "discard of unknown connection");
            return Err(Error::InternalPoolError(format!(
                "discard of unknown connection {}",
                id
            )));
        };
        if current != EntryState::Available {
            drop(state);
            error!(
                pool = %self.config.name,
                connection = %id,
                state = ?current,
                "discard of reserved connection ignored"
            );
            return Err(Error::InternalPoolError(format!(
                "cannot discard connection {} in state {:?}",
                id, current
            )));
        }

        let removed = state.remove(id);
        state.counters.discarded += 1;
        state.recompute_next_expiration(self.config.max_idle());
        drop(state);
        self.changed.notify_all();
        if self.trace() {
            debug!(pool = %self.config.name, connection = %id, "connection discarded");
        }
        if let Some(conn) = removed.and_then(|entry| entry.conn) {
            self.factory.destroy(conn);
        }
        Ok(())
    }

    /// Discard every available connection idle for at least `max_idle`
    ///
    /// Returns the next instant at which an available connection will expire.
    pub(crate) fn expire(&self) -> Option<Instant> {
        let max_idle = self.config.max_idle()?;
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.destroyed {
            return None;
        }

        let expired: SmallVec<[ConnectionId; 8]> = state
            .entries
            .values()
            .filter(|entry| entry.is_available() && entry.age(now) >= max_idle)
            .map(|entry| entry.id)
            .collect();

        let mut doomed: SmallVec<[F::Connection; 4]> = SmallVec::new();
        for id in &expired {
            if let Some(conn) = state.remove(*id).and_then(|entry| entry.conn) {
                doomed.push(conn);
            }
        }
        state.counters.expired += expired.len() as u64;
        state.recompute_next_expiration(Some(max_idle));
        let next = state.next_expiration;
        drop(state);

        if !expired.is_empty() {
            self.changed.notify_all();
            if self.trace() {
                debug!(pool = %self.config.name, expired = expired.len(), "expired idle connections");
            }
        }
        for conn in doomed {
            self.factory.destroy(conn);
        }
        next
    }

    /// Mark the pool terminal and destroy every connection it owns
    ///
    /// Returns false if the pool was already destroyed.
    pub(crate) fn destroy(&self) -> bool {
        let mut state = self.state.lock();
        if state.destroyed {
            return false;
        }
        state.destroyed = true;
        let entries = std::mem::take(&mut state.entries);
        state.available = 0;
        state.next_expiration = None;
        state.counters.discarded += entries.len() as u64;
        drop(state);

        self.changed.notify_all();
        self.sweeper_wake.notify_all();

        let count = entries.len();
        for conn in entries.into_values().filter_map(|entry| entry.conn) {
            self.factory.destroy(conn);
        }
        info!(pool = %self.config.name, pool_id = %self.id, connections = count, "pool destroyed");
        true
    }

    fn metrics(&self) -> PoolMetrics {
        let state = self.state.lock();
        let pending_release = state.count_state(|s| matches!(s, EntryState::PendingRelease { .. }));
        let in_use = state.count_state(|s| s == EntryState::InUse);
        PoolMetrics {
            total: state.total(),
            available: state.available,
            in_use,
            pending_release,
            waiting: state.waiting,
            high_water: state.counters.high_water,
            created: state.counters.created,
            discarded: state.counters.discarded,
            expired: state.counters.expired,
            errors: state.counters.errors,
            timeouts: state.counters.timeouts,
            mean_used_ms: state.counters.mean_used().as_secs_f64() * 1000.0,
            mean_unused_ms: state.counters.mean_unused().as_secs_f64() * 1000.0,
        }
    }
}

/// A bounded pool of connections created by a [`ConnectionFactory`]
///
/// The pool owns its entries for its whole life and is destroyed exactly
/// once, either by [`destroy`](Self::destroy) or on drop.
///
/// # Example
///
/// ```ignore
/// let pool = ConnectionPool::new(PoolConfig::new(8), MyFactory::new())?;
/// let conn = pool.allocate(Some(&credential), None)?;
/// conn.execute("update ...")?;
/// pool.release(conn, true)?;
/// ```
pub struct ConnectionPool<F: ConnectionFactory> {
    shared: Arc<Shared<F>>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    /// Create a pool without a transaction manager
    pub fn new(config: PoolConfig, factory: F) -> Result<Self> {
        Self::start(config, factory, None)
    }

    /// Create a pool that enlists connections with `transaction_manager`
    pub fn with_transaction_manager(
        config: PoolConfig,
        factory: F,
        transaction_manager: Arc<dyn TransactionManager>,
    ) -> Result<Self> {
        Self::start(config, factory, Some(transaction_manager))
    }

    fn start(
        config: PoolConfig,
        factory: F,
        transaction_manager: Option<Arc<dyn TransactionManager>>,
    ) -> Result<Self> {
        config.validate()?;
        let shared = Arc::new(Shared {
            id: PoolId::new(),
            config,
            factory,
            transaction_manager,
            state: Mutex::new(PoolState::new()),
            changed: Condvar::new(),
            sweeper_wake: Condvar::new(),
        });

        Self::prefill(&shared)?;

        let sweeper = match shared.config.max_idle() {
            Some(_) => Some(Sweeper::spawn(Arc::clone(&shared)).map_err(|e| {
                shared.destroy();
                Error::InternalPoolError(format!("failed to start sweeper: {}", e))
            })?),
            None => None,
        };

        info!(
            pool = %shared.config.name,
            pool_id = %shared.id,
            max_connections = shared.config.max_connections,
            min_connections = shared.config.min_connections,
            "pool started"
        );
        Ok(Self {
            shared,
            sweeper: Mutex::new(sweeper),
        })
    }

    fn prefill(shared: &Arc<Shared<F>>) -> Result<()> {
        for _ in 0..shared.config.min_connections {
            let conn = match shared.factory.create(None, None) {
                Ok(conn) => conn,
                Err(e) => {
                    error!(pool = %shared.config.name, error = %e, "prefill failed");
                    shared.destroy();
                    return Err(e);
                }
            };
            let xa = shared.factory.xa_resource(&conn);
            let now = Instant::now();
            let mut state = shared.state.lock();
            let id = state.allocate_id();
            state.insert(PoolEntry::available(id, conn, xa, now));
            state.counters.created += 1;
        }
        let mut state = shared.state.lock();
        state.recompute_next_expiration(shared.config.max_idle());
        Ok(())
    }

    pub(crate) fn shared(&self) -> &Arc<Shared<F>> {
        &self.shared
    }

    /// Identity of this pool instance
    pub fn id(&self) -> PoolId {
        self.shared.id
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// The factory adapter
    pub fn factory(&self) -> &F {
        &self.shared.factory
    }

    /// Allocate a connection, waiting up to the configured allocation timeout
    pub fn allocate(
        &self,
        credential: Option<&Credential>,
        request_info: Option<&RequestInfo>,
    ) -> Result<PooledConnection<F>> {
        self.shared
            .allocate(credential, request_info, self.shared.config.allocation_timeout())
    }

    /// Allocate a connection, waiting up to `timeout` (zero never blocks)
    pub fn allocate_with_timeout(
        &self,
        credential: Option<&Credential>,
        request_info: Option<&RequestInfo>,
        timeout: Duration,
    ) -> Result<PooledConnection<F>> {
        self.shared.allocate(credential, request_info, timeout)
    }

    /// Allocate only if a connection can be had without blocking
    pub fn try_allocate(
        &self,
        credential: Option<&Credential>,
        request_info: Option<&RequestInfo>,
    ) -> Result<PooledConnection<F>> {
        self.shared.allocate(credential, request_info, Duration::ZERO)
    }

    /// Return a connection to the pool
    ///
    /// With `success == false` the connection is destroyed instead of reused.
    /// While the connection is still enlisted in a transaction branch the
    /// availability change is deferred until the branch ends.
    pub fn release(&self, mut conn: PooledConnection<F>, success: bool) -> Result<()> {
        if conn.pool_id() != self.shared.id {
            error!(
                pool = %self.shared.config.name,
                connection = %conn.id(),
                "release of connection owned by another pool"
            );
            // Dropping the handle returns it to its own pool as a failure.
            return Err(Error::InternalPoolError(format!(
                "connection {} belongs to another pool",
                conn.id()
            )));
        }
        match conn.take() {
            Some((id, raw, xa, checked_out_at)) => self
                .shared
                .release_connection(id, raw, xa, checked_out_at, success, false),
            None => Err(Error::InternalPoolError("connection already released".into())),
        }
    }

    /// Destroy a checked-out connection instead of returning it
    pub fn discard(&self, mut conn: PooledConnection<F>) -> Result<()> {
        if conn.pool_id() != self.shared.id {
            return Err(Error::InternalPoolError(format!(
                "connection {} belongs to another pool",
                conn.id()
            )));
        }
        match conn.take() {
            Some((id, raw, xa, checked_out_at)) => self
                .shared
                .release_connection(id, raw, xa, checked_out_at, false, true),
            None => Err(Error::InternalPoolError("connection already released".into())),
        }
    }

    /// Destroy an available connection by id
    ///
    /// Fails with `InternalPoolError` if the connection is in use or pending
    /// release; the pool is left unchanged in that case.
    pub fn discard_available(&self, id: ConnectionId) -> Result<()> {
        self.shared.discard_available(id)
    }

    /// Run one expiration pass now
    ///
    /// Returns the next instant at which an available connection expires.
    pub fn expire(&self) -> Option<Instant> {
        self.shared.expire()
    }

    /// Destroy the pool
    ///
    /// Destroys every connection the pool owns and stops the sweeper.
    /// Connections still held by callers are destroyed when released.
    /// Later allocations fail with `PoolDestroyed`. Idempotent.
    pub fn destroy(&self) {
        self.shared.destroy();
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.join();
        }
    }

    /// Check if the pool was destroyed
    pub fn is_destroyed(&self) -> bool {
        self.shared.state.lock().destroyed
    }

    /// Snapshot of pool counters
    pub fn metrics(&self) -> PoolMetrics {
        self.shared.metrics()
    }

    /// Connections currently tracked by the pool
    pub fn total(&self) -> usize {
        self.shared.state.lock().total()
    }

    /// Connections ready to be allocated
    pub fn available(&self) -> usize {
        self.shared.state.lock().available
    }

    /// Snapshot of the available connections, ordered by id
    pub fn available_connections(&self) -> Vec<AvailableInfo> {
        let state = self.shared.state.lock();
        AvailableInfo::collect(&state.entries, Instant::now())
    }

    /// State of one connection, `None` if the pool does not track it
    pub fn connection_state(&self, id: ConnectionId) -> Option<ConnectionState> {
        let state = self.shared.state.lock();
        state.entries.get(&id).map(|entry| entry.state.into())
    }

    /// Outstanding enlistments of one connection
    pub fn enlistment_count(&self, id: ConnectionId) -> Option<u32> {
        let state = self.shared.state.lock();
        state.entries.get(&id).map(|entry| entry.enlistments)
    }

    /// Next instant at which an available connection will expire
    pub fn next_expiration(&self) -> Option<Instant> {
        self.shared.state.lock().next_expiration
    }
}

impl<F: ConnectionFactory> Drop for ConnectionPool<F> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<F: ConnectionFactory> std::fmt::Debug for ConnectionPool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ConnectionPool")
            .field("name", &self.shared.config.name)
            .field("id", &self.shared.id)
            .field("total", &state.total())
            .field("available", &state.available)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
