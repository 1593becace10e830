use crate::common::{init_tracing, MockFactory};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use xapool::{Error, PoolBuilder};

#[test]
fn test_error_release_destroys_connection() {
    init_tracing();
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(2)
        .build()
        .unwrap();

    let conn = pool.allocate(None, None).unwrap();
    let id = conn.id();
    pool.release(conn, false).unwrap();

    assert_eq!(pool.connection_state(id), None);
    assert_eq!(factory.destroyed(), 1);
    assert_eq!(factory.cleaned.load(Ordering::SeqCst), 0);

    let next = pool.allocate(None, None).unwrap();
    assert_ne!(next.id(), id);
    pool.release(next, true).unwrap();
}

#[test]
fn test_cleanup_failure_destroys_connection() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(1)
        .build()
        .unwrap();
    factory.fail_cleanup.store(true, Ordering::SeqCst);

    let conn = pool.allocate(None, None).unwrap();
    pool.release(conn, true).unwrap();
    assert_eq!(pool.total(), 0);
    assert_eq!(pool.metrics().errors, 1);
}

#[test]
fn test_creation_failure_propagates() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(1)
        .build()
        .unwrap();
    factory.fail_create.store(true, Ordering::SeqCst);

    let err = pool.allocate(None, None).unwrap_err();
    assert!(matches!(err, Error::ResourceCreationFailed(_)));
    assert!(!err.is_retryable());
    assert_eq!(pool.total(), 0);

    factory.fail_create.store(false, Ordering::SeqCst);
    let conn = pool.try_allocate(None, None).unwrap();
    pool.release(conn, true).unwrap();
}

#[test]
fn test_prefill_failure_fails_construction() {
    let factory = MockFactory::new();
    factory.fail_create.store(true, Ordering::SeqCst);
    let err = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(2)
        .min_connections(1)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::ResourceCreationFailed(_)));
}

#[test]
fn test_discard_destroys_without_cleanup() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(1)
        .build()
        .unwrap();
    let conn = pool.allocate(None, None).unwrap();
    pool.discard(conn).unwrap();

    assert_eq!(factory.destroyed(), 1);
    assert_eq!(factory.cleaned.load(Ordering::SeqCst), 0);
    let metrics = pool.metrics();
    assert_eq!(metrics.discarded, 1);
    assert_eq!(metrics.errors, 0);
}

#[test]
fn test_discard_available_rejects_in_use() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(2)
        .build()
        .unwrap();
    let busy = pool.allocate(None, None).unwrap();

    let err = pool.discard_available(busy.id()).unwrap_err();
    assert!(matches!(err, Error::InternalPoolError(_)));
    assert_eq!(pool.total(), 1);
    pool.release(busy, true).unwrap();
}
