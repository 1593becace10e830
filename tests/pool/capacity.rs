use crate::common::{init_tracing, MockFactory};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use xapool::{ConnectionId, Error, PoolBuilder};

#[test]
fn test_allocations_stop_at_max() {
    init_tracing();
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(3)
        .build()
        .unwrap();

    let held: Vec<_> = (0..3).map(|_| pool.allocate(None, None).unwrap()).collect();
    let err = pool.try_allocate(None, None).unwrap_err();
    assert!(matches!(err, Error::ResourceExhausted { maximum: 3, .. }));
    assert_eq!(pool.total(), 3);
    assert_eq!(factory.created(), 3);

    for conn in held {
        pool.release(conn, true).unwrap();
    }
    assert_eq!(pool.available(), 3);
}

#[test]
fn test_no_double_issuance_under_contention() {
    init_tracing();
    const THREADS: usize = 8;
    const MAX: usize = 3;
    const ROUNDS: usize = 40;

    let factory = MockFactory::new();
    let pool = Arc::new(
        PoolBuilder::new(Arc::clone(&factory))
            .max_connections(MAX)
            .allocation_timeout(Duration::from_secs(10))
            .build()
            .unwrap(),
    );
    let holders: Arc<Mutex<HashSet<ConnectionId>>> = Arc::new(Mutex::new(HashSet::new()));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let holders = Arc::clone(&holders);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..ROUNDS {
                    let conn = pool.allocate(None, None).unwrap();
                    let id = conn.id();
                    assert!(holders.lock().insert(id), "{} handed out twice", id);
                    assert!(holders.lock().len() <= MAX);
                    thread::sleep(Duration::from_micros(rng.gen_range(0..200)));
                    holders.lock().remove(&id);
                    pool.release(conn, true).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let metrics = pool.metrics();
    assert!(metrics.high_water <= MAX);
    assert!(factory.created() as usize <= MAX);
    assert_eq!(metrics.in_use, 0);
    assert_eq!(metrics.waiting, 0);
    assert_eq!(metrics.available, metrics.total);
}

#[test]
fn test_unbounded_pool_keeps_creating() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(0)
        .build()
        .unwrap();

    let held: Vec<_> = (0..20).map(|_| pool.try_allocate(None, None).unwrap()).collect();
    assert_eq!(pool.total(), 20);
    for conn in held {
        pool.release(conn, true).unwrap();
    }
}

#[test]
fn test_destroy_releases_everything() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(4)
        .min_connections(2)
        .build()
        .unwrap();
    let held = pool.allocate(None, None).unwrap();
    assert_eq!(pool.total(), 2);

    pool.destroy();
    assert!(matches!(pool.allocate(None, None), Err(Error::PoolDestroyed)));
    pool.release(held, true).unwrap();
    assert_eq!(factory.live(), 0);
}

#[test]
fn test_drop_destroys_pool() {
    let factory = MockFactory::new();
    {
        let pool = PoolBuilder::new(Arc::clone(&factory))
            .min_connections(3)
            .max_connections(3)
            .build()
            .unwrap();
        assert_eq!(pool.available(), 3);
    }
    assert_eq!(factory.destroyed(), 3);
}

#[test]
fn test_handle_outliving_pool_is_destroyed() {
    let factory = MockFactory::new();
    let pool = PoolBuilder::new(Arc::clone(&factory))
        .max_connections(2)
        .build()
        .unwrap();
    let conn = pool.allocate(None, None).unwrap();

    drop(pool);
    assert_eq!(factory.created(), 1);
    assert_eq!(factory.destroyed(), 0);

    drop(conn);
    assert_eq!(factory.destroyed(), 1);
    assert_eq!(factory.live(), 0);
}
