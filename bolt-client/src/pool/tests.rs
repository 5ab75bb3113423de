use std::sync::Arc;
use std::thread;

use super::{ConnectionPool, Connector};
use crate::connection::{Address, Connection};
use crate::test_support::ScriptedStream;

fn pool() -> ConnectionPool<ScriptedStream> {
    let connector: Connector<ScriptedStream> =
        Box::new(|address| Ok(Connection::new(address.clone(), ScriptedStream::empty())));
    ConnectionPool::new(connector)
}

fn address() -> Address {
    Address::new("127.0.0.1", 7687)
}

#[test]
fn can_acquire() {
    let pool = pool();
    let address = address();
    let connection = pool.acquire(&address).expect("acquire should succeed");
    assert_eq!(connection.address(), &address);
    assert_eq!(pool.in_use_count(&address), 1);
    assert_eq!(pool.idle_count(&address), 0);
}

#[test]
fn can_acquire_twice() {
    let pool = pool();
    let address = address();
    let connection_1 = pool.acquire(&address).expect("acquire should succeed");
    let connection_2 = pool.acquire(&address).expect("acquire should succeed");
    assert_eq!(connection_1.address(), &address);
    assert_eq!(connection_2.address(), &address);
    assert_eq!(pool.in_use_count(&address), 2);
    assert_eq!(pool.idle_count(&address), 0);
}

#[test]
fn can_acquire_two_addresses() {
    let pool = pool();
    let address_1 = Address::new("127.0.0.1", 7687);
    let address_2 = Address::new("127.0.0.1", 7474);
    let connection_1 = pool.acquire(&address_1).expect("acquire should succeed");
    let connection_2 = pool.acquire(&address_2).expect("acquire should succeed");
    assert_eq!(connection_1.address(), &address_1);
    assert_eq!(connection_2.address(), &address_2);
    assert_eq!(pool.in_use_count(&address_1), 1);
    assert_eq!(pool.in_use_count(&address_2), 1);
}

#[test]
fn can_acquire_and_release() {
    let pool = pool();
    let address = address();
    let connection = pool.acquire(&address).expect("acquire should succeed");
    assert_eq!(pool.in_use_count(&address), 1);
    assert_eq!(pool.idle_count(&address), 0);
    pool.release(connection);
    assert_eq!(pool.in_use_count(&address), 0);
    assert_eq!(pool.idle_count(&address), 1);
}

#[test]
fn released_connection_is_reacquired() {
    let pool = pool();
    let address = address();
    let connection = pool.acquire(&address).expect("acquire should succeed");
    pool.release(connection);

    let _reused = pool.acquire(&address).expect("acquire should succeed");
    assert_eq!(pool.in_use_count(&address), 1);
    assert_eq!(pool.idle_count(&address), 0);
}

#[test]
fn pool_accounting_over_many_acquires_and_releases() {
    let pool = pool();
    let address = address();

    let connections: Vec<_> = (0..5)
        .map(|_| pool.acquire(&address).expect("acquire should succeed"))
        .collect();
    assert_eq!(pool.in_use_count(&address), 5);
    assert_eq!(pool.idle_count(&address), 0);

    for connection in connections.into_iter().take(3) {
        pool.release(connection);
    }
    assert_eq!(pool.in_use_count(&address), 2);
    assert_eq!(pool.idle_count(&address), 3);
}

#[test]
fn closed_connection_is_discarded_on_release() {
    let pool = pool();
    let address = address();
    let mut connection = pool.acquire(&address).expect("acquire should succeed");
    connection.close();
    pool.release(connection);
    assert_eq!(pool.in_use_count(&address), 0);
    assert_eq!(pool.idle_count(&address), 0);
}

#[test]
fn stale_idle_connection_is_not_handed_out() {
    let pool = pool();
    let address = address();
    let connection = pool.acquire(&address).expect("acquire should succeed");
    pool.release(connection);

    // close the pooled connection behind the pool's back
    {
        let mut inner = pool.locked();
        let entry = inner.servers.get_mut(&address).unwrap();
        entry.idle[0].close();
    }

    let fresh = pool.acquire(&address).expect("acquire should succeed");
    assert!(!fresh.closed());
    assert_eq!(pool.idle_count(&address), 0);
}

#[test]
fn close_empties_the_pool_and_is_idempotent() {
    let pool = pool();
    let address = address();
    let connection = pool.acquire(&address).expect("acquire should succeed");
    pool.release(connection);
    assert_eq!(pool.idle_count(&address), 1);

    pool.close();
    assert_eq!(pool.idle_count(&address), 0);
    pool.close();
    assert_eq!(pool.idle_count(&address), 0);
}

#[test]
fn acquire_is_thread_safe() {
    let pool = Arc::new(pool());
    let address = address();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pool = pool.clone();
            let address = address.clone();
            thread::spawn(move || {
                let connection = pool.acquire(&address).expect("acquire should succeed");
                pool.release(connection);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread should not panic");
    }

    assert_eq!(pool.in_use_count(&address), 0);
    let idle = pool.idle_count(&address);
    assert!((1..=4).contains(&idle), "no connection was lost: {idle}");
}
