use crate::common::{init_tracing, MockFactory};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use xapool::PoolBuilder;

fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

#[test]
fn test_idle_connections_expire() {
    init_tracing();
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .name("expiring")
        .max_connections(4)
        .max_idle(Duration::from_millis(100))
        .build()
        .unwrap();

    let a = pool.allocate(None, None).unwrap();
    let b = pool.allocate(None, None).unwrap();
    pool.release(a, true).unwrap();
    pool.release(b, true).unwrap();
    assert!(pool.next_expiration().is_some());

    assert!(wait_until(Duration::from_secs(3), || pool.total() == 0));
    assert_eq!(factory.destroyed(), 2);
    assert_eq!(pool.metrics().expired, 2);
    assert!(pool.available_connections().is_empty());
    assert!(pool.next_expiration().is_none());
}

#[test]
fn test_held_connection_survives_sweeps() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(2)
        .max_idle(Duration::from_millis(30))
        .build()
        .unwrap();

    let held = pool.allocate(None, None).unwrap();
    let idle = pool.allocate(None, None).unwrap();
    pool.release(idle, true).unwrap();

    assert!(wait_until(Duration::from_secs(3), || pool.total() == 1));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(pool.total(), 1);
    pool.release(held, true).unwrap();
}

#[test]
fn test_prefilled_connections_expire() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(3)
        .min_connections(3)
        .max_idle(Duration::from_millis(50))
        .build()
        .unwrap();
    assert!(wait_until(Duration::from_secs(3), || pool.total() == 0));
    assert_eq!(factory.destroyed(), 3);
}

#[test]
fn test_no_expiration_without_max_idle() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(1)
        .build()
        .unwrap();
    let conn = pool.allocate(None, None).unwrap();
    pool.release(conn, true).unwrap();

    assert!(pool.next_expiration().is_none());
    assert!(pool.expire().is_none());
    assert_eq!(pool.available(), 1);
}
