//! Network Tests
//!
//! Drives every adapter through a real TCP connection pool against a local
//! RESP server, plus connection provider behaviour.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use common::{unique_key, TestServer};
use kvstructs::network::{Connection, ConnectionPool};
use kvstructs::protocol::{Command, Reply, Wait};
use kvstructs::{Client, Config, Store, StructsError};

// =============================================================================
// Connection Tests
// =============================================================================

#[test]
fn test_connection_round_trip() {
    let server = TestServer::start();
    let mut conn = Connection::open(&server.config()).unwrap();

    let reply = conn.execute(&Command::new("PING")).unwrap();

    assert_eq!(reply, Reply::Status("PONG".to_string()));
    assert!(conn.peer_addr().starts_with("127.0.0.1:"));
}

#[test]
fn test_connection_error_reply_keeps_stream_in_sync() {
    let server = TestServer::start();
    let mut conn = Connection::open(&server.config()).unwrap();

    let err = conn.execute(&Command::new("NOPE")).unwrap_err();
    let reply = conn.execute(&Command::new("SET").arg("k").arg("v")).unwrap();

    assert!(matches!(err, StructsError::Server(_)));
    assert_eq!(reply, Reply::ok());
}

fn database_config(server: &TestServer, database: u32) -> Config {
    Config::builder()
        .host("127.0.0.1")
        .port(server.port)
        .database(database)
        .read_timeout_ms(2000)
        .build()
}

#[test]
fn test_connection_selects_database() {
    let server = TestServer::start();
    let default_db = server.client().dictionary("d").unwrap();
    default_db.set("f", "db0").unwrap();

    let selected = Client::new(database_config(&server, 3))
        .dictionary("d")
        .unwrap();

    assert_eq!(selected.get("f").unwrap(), None);
    selected.set("f", "db3").unwrap();
    assert_eq!(default_db.get("f").unwrap(), Some(Bytes::from_static(b"db0")));
    assert_eq!(server.store.key_count_in(0), 1);
    assert_eq!(server.store.key_count_in(3), 1);
}

#[test]
fn test_connection_rejects_unknown_database() {
    let server = TestServer::start();

    let err = Connection::open(&database_config(&server, 99)).err().unwrap();

    assert!(matches!(err, StructsError::Server(_)));
}

#[test]
fn test_connection_blocking_wait_beyond_duration_range() {
    let server = TestServer::start();
    let mut conn = Connection::open(&server.config()).unwrap();
    conn.execute(&Command::new("LPUSH").arg("k").arg("v")).unwrap();

    let reply = conn
        .execute(
            &Command::new("BRPOP")
                .arg("k")
                .arg("1")
                .with_wait(Wait::Upto(Duration::MAX)),
        )
        .unwrap();

    assert_eq!(
        reply,
        Reply::bulk_array([Bytes::from_static(b"k"), Bytes::from_static(b"v")])
    );
    // The regular read timeout is back in place
    assert_eq!(
        conn.execute(&Command::new("PING")).unwrap(),
        Reply::Status("PONG".to_string())
    );
}

#[test]
fn test_connection_unreachable_store() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .connect_timeout_ms(500)
        .build();
    let err = Connection::open(&config).err().unwrap();

    assert!(matches!(err, StructsError::Connection(_)));
}

// =============================================================================
// Pool Tests
// =============================================================================

#[test]
fn test_pool_reuses_connections() {
    let server = TestServer::start();
    let pool = ConnectionPool::connect(server.config()).unwrap();
    assert_eq!(pool.idle_count(), 1);

    for _ in 0..5 {
        pool.execute(&Command::new("PING")).unwrap();
    }

    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn test_pool_blocking_pop_does_not_block_others() {
    let server = TestServer::start();
    let pool = Arc::new(ConnectionPool::connect(server.config()).unwrap());
    let key = unique_key();

    let waiter = {
        let pool = pool.clone();
        let key = key.clone();
        thread::spawn(move || {
            pool.execute(
                &Command::new("BRPOP")
                    .arg(key.as_str())
                    .arg("2")
                    .with_wait(Wait::Upto(Duration::from_secs(2))),
            )
            .unwrap()
        })
    };
    thread::sleep(Duration::from_millis(100));

    // Runs on a second connection while the first is parked in BRPOP
    pool.execute(&Command::new("LPUSH").arg(key.as_str()).arg("v"))
        .unwrap();

    let reply = waiter.join().unwrap();
    assert_eq!(
        reply,
        Reply::bulk_array([Bytes::from(key), Bytes::from_static(b"v")])
    );
    assert_eq!(pool.idle_count(), 2);
}

#[test]
fn test_pool_selects_database_on_every_connection() {
    let server = TestServer::start();
    let client = Client::new(database_config(&server, 5));
    let key = unique_key();
    let consumer = client.queue(key.clone()).unwrap();
    let producer = client.queue(key).unwrap();

    // The parked pop holds one connection, so the push dials a second one
    let waiter = thread::spawn(move || consumer.get(Duration::from_secs(2)).unwrap());
    thread::sleep(Duration::from_millis(100));
    producer.add("job").unwrap();

    assert_eq!(waiter.join().unwrap(), Some(Bytes::from_static(b"job")));
    assert_eq!(server.store.key_count_in(0), 0);
}

#[test]
fn test_pool_idle_cap() {
    let server = TestServer::start();
    let config = Config::builder()
        .host("127.0.0.1")
        .port(server.port)
        .max_idle_connections(1)
        .build();
    let pool = Arc::new(ConnectionPool::connect(config).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    pool.execute(&Command::new("PING")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(pool.idle_count(), 1);
}

// =============================================================================
// Client Tests
// =============================================================================

#[test]
fn test_client_connects_lazily_and_once() {
    let server = TestServer::start();
    let client = Arc::new(server.client());

    let stores: Vec<Arc<dyn Store>> = (0..8)
        .map(|_| {
            let client = client.clone();
            thread::spawn(move || client.store().unwrap())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    for store in &stores[1..] {
        assert!(Arc::ptr_eq(&stores[0], store));
    }
}

#[test]
fn test_client_connect_failure_surfaces_and_retries() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let client = Client::new(
        Config::builder()
            .host("127.0.0.1")
            .port(port)
            .connect_timeout_ms(500)
            .build(),
    );

    assert!(matches!(
        client.dictionary("d").unwrap_err(),
        StructsError::Connection(_)
    ));
    assert!(client.ping().is_err());
}

#[test]
fn test_client_ping() {
    let server = TestServer::start();

    server.client().ping().unwrap();
}

// =============================================================================
// Adapters Over TCP
// =============================================================================

#[test]
fn test_dict_over_tcp() {
    let server = TestServer::start();
    let client = server.client();
    let d = client.dictionary(unique_key()).unwrap();

    d.set("foo", "bar").unwrap();
    d.set("bar", "foo").unwrap();

    assert_eq!(d.get("foo").unwrap(), Some(Bytes::from_static(b"bar")));
    assert_eq!(d.keys("*").count(), 2);
    assert!(d.delete("foo").unwrap());
    assert_eq!(d.get("foo").unwrap(), None);
}

#[test]
fn test_set_over_tcp() {
    let server = TestServer::start();
    let client = server.client();
    let s1 = client.set(unique_key()).unwrap();
    let s2 = client.set(unique_key()).unwrap();
    s1.add("foo").unwrap();
    s1.add("bar").unwrap();
    s2.add("bar").unwrap();

    let iterated: HashSet<Bytes> = s1.iterate().map(|m| m.unwrap()).collect();

    assert_eq!(iterated.len(), 2);
    assert_eq!(
        s1.difference(&s2).unwrap(),
        HashSet::from([Bytes::from_static(b"foo")])
    );
}

#[test]
fn test_list_over_tcp() {
    let server = TestServer::start();
    let client = server.client();
    let list = client.list(unique_key()).unwrap();
    list.append("foo").unwrap();
    list.append("foo").unwrap();
    list.append("bar").unwrap();

    list.pop_at(1).unwrap();

    assert_eq!(list.get(1).unwrap(), Some(Bytes::from_static(b"bar")));
    assert!(matches!(
        list.set(5, "x").unwrap_err(),
        StructsError::IndexOutOfRange
    ));
}

#[test]
fn test_queue_over_tcp() {
    let server = TestServer::start();
    let client = server.client();
    let q = client.queue(unique_key()).unwrap();
    q.add("x").unwrap();
    q.add("y").unwrap();

    assert_eq!(q.get(Duration::from_secs(1)).unwrap(), Some(Bytes::from_static(b"x")));
    assert_eq!(q.get(Duration::from_secs(1)).unwrap(), Some(Bytes::from_static(b"y")));
    assert_eq!(q.get(Duration::from_millis(200)).unwrap(), None);
}

#[test]
fn test_queue_huge_timeout_over_tcp() {
    let server = TestServer::start();
    let client = server.client();
    let q = client.queue(unique_key()).unwrap();
    q.add("x").unwrap();

    assert_eq!(q.get(Duration::MAX).unwrap(), Some(Bytes::from_static(b"x")));
}

#[test]
fn test_counter_over_tcp() {
    let server = TestServer::start();
    let client = server.client();
    let c = client.counter(unique_key()).unwrap();

    assert_eq!(c.increment(10).unwrap(), "0000000001");
    assert_eq!(c.increment(10).unwrap(), "0000000002");
    assert_eq!(c.decrement(10).unwrap(), "0000000001");
    assert_eq!(c.value(0), "1");
    assert!(c.dispose().unwrap());
    assert_eq!(server.store.key_count(), 0);
}
