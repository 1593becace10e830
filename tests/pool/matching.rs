use crate::common::{adams, scott, MockFactory};
use std::sync::Arc;
use xapool::{PoolBuilder, RequestInfo};

#[test]
fn test_same_credential_reuses_connection() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(1)
        .build()
        .unwrap();

    let conn = pool.allocate(Some(&scott()), None).unwrap();
    let first = conn.id();
    pool.release(conn, true).unwrap();

    let conn = pool.allocate(Some(&scott()), None).unwrap();
    assert_eq!(conn.id(), first);
    assert_eq!(conn.uses, 2);
    assert_eq!(conn.user.as_deref(), Some("scott"));
    pool.release(conn, true).unwrap();
    assert_eq!(factory.created(), 1);
}

#[test]
fn test_other_credential_gets_new_connection() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(2)
        .build()
        .unwrap();

    let conn = pool.allocate(Some(&scott()), None).unwrap();
    let scotts = conn.id();
    pool.release(conn, true).unwrap();

    let conn = pool.allocate(Some(&adams()), None).unwrap();
    assert_ne!(conn.id(), scotts);
    assert_eq!(conn.user.as_deref(), Some("adams"));
    pool.release(conn, true).unwrap();

    assert_eq!(pool.total(), 2);
    let users: Vec<_> = pool
        .available_connections()
        .into_iter()
        .map(|info| info.user)
        .collect();
    assert_eq!(users, vec![Some("scott".to_string()), Some("adams".to_string())]);
}

#[test]
fn test_request_info_is_part_of_match() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(4)
        .build()
        .unwrap();
    let serializable = RequestInfo::new().with("isolation", "serializable");

    let conn = pool.allocate(Some(&scott()), Some(&serializable)).unwrap();
    let first = conn.id();
    pool.release(conn, true).unwrap();

    let plain = pool.allocate(Some(&scott()), None).unwrap();
    assert_ne!(plain.id(), first);

    let again = pool.allocate(Some(&scott()), Some(&serializable)).unwrap();
    assert_eq!(again.id(), first);
    pool.release(plain, true).unwrap();
    pool.release(again, true).unwrap();
}

#[test]
fn test_full_pool_evicts_unmatched_connection() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(1)
        .build()
        .unwrap();

    let conn = pool.allocate(Some(&scott()), None).unwrap();
    let scotts = conn.id();
    pool.release(conn, true).unwrap();

    let conn = pool.allocate(Some(&adams()), None).unwrap();
    assert_eq!(pool.connection_state(scotts), None);
    assert_eq!(factory.destroyed(), 1);
    assert_eq!(pool.total(), 1);
    pool.release(conn, true).unwrap();
}
