//! Shared test utilities: a counting factory and a recording transaction manager

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use xapool::{
    Credential, DelistOutcome, EnlistmentListener, Error, RequestInfo, Result, TransactionError,
    TransactionManager, XaResource,
};

/// Route pool logs to the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// =============================================================================
// FACTORY
// =============================================================================

#[derive(Debug)]
pub struct MockXa {
    name: String,
}

impl XaResource for MockXa {
    fn resource_name(&self) -> &str {
        &self.name
    }
}

/// Connection handed out by [`MockFactory`]
#[derive(Debug)]
pub struct MockConn {
    pub serial: u64,
    pub user: Option<String>,
    pub xa: Option<Arc<dyn XaResource>>,
    pub uses: u32,
}

/// Factory that counts every lifecycle call
#[derive(Default)]
pub struct MockFactory {
    pub created: AtomicU64,
    pub destroyed: AtomicUsize,
    pub cleaned: AtomicUsize,
    pub handed_out: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_cleanup: AtomicBool,
    pub xa: bool,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Factory whose connections take part in 2PC
    pub fn with_xa() -> Arc<Self> {
        Arc::new(Self {
            xa: true,
            ..Self::default()
        })
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.created() as usize - self.destroyed()
    }
}

impl xapool::ConnectionFactory for MockFactory {
    type Connection = MockConn;

    fn create(
        &self,
        credential: Option<&Credential>,
        _request_info: Option<&RequestInfo>,
    ) -> Result<MockConn> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::ResourceCreationFailed("backend refused".into()));
        }
        let serial = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let xa: Option<Arc<dyn XaResource>> = if self.xa {
            Some(Arc::new(MockXa {
                name: format!("mock-{}", serial),
            }))
        } else {
            None
        };
        Ok(MockConn {
            serial,
            user: credential.map(|c| c.user.clone()),
            xa,
            uses: 0,
        })
    }

    fn connection_handle(
        &self,
        conn: &mut MockConn,
        _credential: Option<&Credential>,
    ) -> Result<()> {
        conn.uses += 1;
        self.handed_out.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn xa_resource(&self, conn: &MockConn) -> Option<Arc<dyn XaResource>> {
        conn.xa.clone()
    }

    fn cleanup(&self, _conn: &mut MockConn) -> Result<()> {
        if self.fail_cleanup.load(Ordering::SeqCst) {
            return Err(Error::ResourceCreationFailed("cleanup failed".into()));
        }
        self.cleaned.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn destroy(&self, _conn: MockConn) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// TRANSACTION MANAGER
// =============================================================================

/// Transaction manager that enlists immediately and ends branches on demand
#[derive(Default)]
pub struct RecordingTm {
    open: Mutex<Vec<(String, Arc<dyn EnlistmentListener>)>>,
    delists: Mutex<Vec<(String, DelistOutcome)>>,
    pub fail_enlist: AtomicBool,
    pub fail_delist: AtomicBool,
}

impl RecordingTm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Branches enlisted and not yet ended
    pub fn open_branches(&self) -> usize {
        self.open.lock().len()
    }

    /// End every open branch
    pub fn complete_all(&self, committed: bool) {
        let open: Vec<_> = self.open.lock().drain(..).collect();
        for (_, listener) in open {
            listener.on_boundary(committed);
        }
    }

    pub fn delists(&self) -> Vec<(String, DelistOutcome)> {
        self.delists.lock().clone()
    }
}

impl TransactionManager for RecordingTm {
    fn enlist(
        &self,
        resource: Arc<dyn XaResource>,
        listener: Arc<dyn EnlistmentListener>,
    ) -> std::result::Result<(), TransactionError> {
        if self.fail_enlist.load(Ordering::SeqCst) {
            return Err(TransactionError::RollbackOnly("tx-1".into()));
        }
        listener.on_enlist();
        self.open
            .lock()
            .push((resource.resource_name().to_string(), listener));
        Ok(())
    }

    fn delist(
        &self,
        resource: Arc<dyn XaResource>,
        outcome: DelistOutcome,
    ) -> std::result::Result<(), TransactionError> {
        self.delists
            .lock()
            .push((resource.resource_name().to_string(), outcome));
        if self.fail_delist.load(Ordering::SeqCst) {
            return Err(TransactionError::InvalidState("branch already ended".into()));
        }
        Ok(())
    }
}

pub fn scott() -> Credential {
    Credential::new("scott", "tiger")
}

pub fn adams() -> Credential {
    Credential::new("adams", "wood")
}
