//! Tests for the Counter adapter
//!
//! These tests verify:
//! - initialisation of absent keys, reuse of existing ones
//! - zero-padded formatting on increment/decrement/value
//! - the cache reflects only this adapter's own writes until refreshed
//! - explicit disposal (dropping never deletes)

mod common;

use common::{memory_client, recording_client, unique_key};
use kvstructs::protocol::Command;
use kvstructs::{Collection, Counter, Store, StructsError};

// =============================================================================
// Initialisation Tests
// =============================================================================

#[test]
fn test_counter_fresh_key_starts_at_zero() {
    let (_store, client) = memory_client();
    let c = client.counter(unique_key()).unwrap();

    assert_eq!(c.value(0), "0");
    assert_eq!(c.get(), 0);
}

#[test]
fn test_counter_open_initialises_absent_key() {
    let (store, client) = recording_client();

    client.counter("hits").unwrap();

    assert_eq!(store.take(), vec!["EXISTS hits", "SET hits 0", "GET hits"]);
}

#[test]
fn test_counter_open_reads_existing_value() {
    let (_store, client) = memory_client();
    let name = unique_key();
    let first = client.counter(name.clone()).unwrap();
    first.increment(0).unwrap();
    first.increment(0).unwrap();

    let second = client.counter(name).unwrap();

    assert_eq!(second.value(0), "2");
}

#[test]
fn test_counter_open_rejects_non_integer() {
    let (_store, client) = memory_client();
    let name = unique_key();
    client
        .store()
        .unwrap()
        .execute(&Command::new("SET").arg(name.as_str()).arg("abc"))
        .unwrap();

    let err = client.counter(name).unwrap_err();

    assert!(matches!(err, StructsError::InvalidInteger(_)));
}

// =============================================================================
// Formatting Tests
// =============================================================================

#[test]
fn test_counter_padding_sequence() {
    let (_store, client) = memory_client();
    let c = client.counter(unique_key()).unwrap();

    assert_eq!(c.increment(5).unwrap(), "00001");
    assert_eq!(c.increment(5).unwrap(), "00002");
    assert_eq!(c.increment(5).unwrap(), "00003");
    assert_eq!(c.decrement(5).unwrap(), "00002");
}

#[test]
fn test_counter_value_after_operations() {
    let (_store, client) = memory_client();
    let c = client.counter(unique_key()).unwrap();

    c.increment(5).unwrap();
    c.increment(5).unwrap();
    assert_eq!(c.decrement(5).unwrap(), "00001");

    assert_eq!(c.value(0), "1");
    assert_eq!(c.to_string(), "1");
}

#[test]
fn test_counter_padding_never_truncates() {
    let (_store, client) = memory_client();
    let c = client.counter(unique_key()).unwrap();
    for _ in 0..123 {
        c.increment(0).unwrap();
    }

    assert_eq!(c.value(2), "123");
    assert_eq!(c.value(10), "0000000123");
}

#[test]
fn test_counter_negative_values() {
    let (_store, client) = memory_client();
    let c = client.counter(unique_key()).unwrap();

    assert_eq!(c.decrement(0).unwrap(), "-1");
    assert_eq!(c.value(5), "-0001");
}

// =============================================================================
// Cache Tests
// =============================================================================

#[test]
fn test_counter_cache_is_stale_until_refresh() {
    let (_store, client) = memory_client();
    let name = unique_key();
    let mine = client.counter(name.clone()).unwrap();
    let theirs = client.counter(name).unwrap();

    theirs.increment(0).unwrap();
    theirs.increment(0).unwrap();

    assert_eq!(mine.value(0), "0");
    assert_eq!(mine.refresh().unwrap(), 2);
    assert_eq!(mine.value(0), "2");
}

#[test]
fn test_counter_increment_returns_authoritative_value() {
    let (_store, client) = memory_client();
    let name = unique_key();
    let mine = client.counter(name.clone()).unwrap();
    let theirs = client.counter(name).unwrap();

    theirs.increment(0).unwrap();

    assert_eq!(mine.increment(0).unwrap(), "2");
    assert_eq!(mine.get(), 2);
}

#[test]
fn test_counter_concurrent_increments_are_atomic() {
    let (_store, client) = memory_client();
    let name = unique_key();
    let counters: Vec<Counter> = (0..4).map(|_| client.counter(name.clone()).unwrap()).collect();

    std::thread::scope(|scope| {
        for c in &counters {
            scope.spawn(move || {
                for _ in 0..250 {
                    c.increment(0).unwrap();
                }
            });
        }
    });

    assert_eq!(counters[0].refresh().unwrap(), 1000);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_counter_drop_keeps_key() {
    let (store, client) = memory_client();
    let name = unique_key();
    {
        let c = client.counter(name.clone()).unwrap();
        c.increment(0).unwrap();
    }

    assert_eq!(store.key_count(), 1);
    assert_eq!(client.counter(name).unwrap().value(0), "1");
}

#[test]
fn test_counter_dispose_deletes_key() {
    let (store, client) = memory_client();
    let c = client.counter(unique_key()).unwrap();
    c.increment(0).unwrap();

    assert!(c.dispose().unwrap());

    assert_eq!(store.key_count(), 0);
}

#[test]
fn test_counter_default_key() {
    let (_store, client) = memory_client();
    let c: Counter = client.default_collection().unwrap();

    assert_eq!(c.key(), "counter");
}
