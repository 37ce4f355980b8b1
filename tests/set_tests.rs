//! Tests for the Set adapter
//!
//! These tests verify:
//! - add/remove/contains/size semantics (add is idempotent)
//! - union and difference computed by the store
//! - incremental iteration, including under concurrent additions

mod common;

use std::collections::HashSet;

use bytes::Bytes;
use common::{memory_client, recording_client, unique_key};

fn bytes_set(values: &[&'static str]) -> HashSet<Bytes> {
    values.iter().map(|v| Bytes::from_static(v.as_bytes())).collect()
}

// =============================================================================
// Membership Tests
// =============================================================================

#[test]
fn test_set_add_contains() {
    let (_store, client) = memory_client();
    let s = client.set(unique_key()).unwrap();

    assert!(s.add("foo").unwrap());

    assert!(s.contains("foo").unwrap());
    assert!(!s.contains("bar").unwrap());
}

#[test]
fn test_set_add_is_idempotent() {
    let (_store, client) = memory_client();
    let s = client.set(unique_key()).unwrap();

    assert!(s.add("foo").unwrap());
    assert!(!s.add("foo").unwrap());

    assert_eq!(s.size().unwrap(), 1);
}

#[test]
fn test_set_size_after_distinct_adds() {
    let (_store, client) = memory_client();
    let s = client.set(unique_key()).unwrap();

    s.add("foo").unwrap();
    s.add("bar").unwrap();

    assert_eq!(s.size().unwrap(), 2);
}

#[test]
fn test_set_remove() {
    let (_store, client) = memory_client();
    let s = client.set(unique_key()).unwrap();
    s.add("foo").unwrap();
    s.add("bar").unwrap();

    assert!(s.remove("foo").unwrap());
    assert!(!s.remove("foo").unwrap());

    assert!(!s.contains("foo").unwrap());
    assert!(s.contains("bar").unwrap());
}

#[test]
fn test_set_integer_members() {
    let (_store, client) = memory_client();
    let s = client.set(unique_key()).unwrap();

    s.add(1).unwrap();
    s.add(2u64).unwrap();

    assert!(s.contains("1").unwrap());
    assert_eq!(s.members().unwrap(), bytes_set(&["1", "2"]));
}

#[test]
fn test_set_members_of_missing_set() {
    let (_store, client) = memory_client();
    let s = client.set(unique_key()).unwrap();

    assert!(s.members().unwrap().is_empty());
    assert_eq!(s.size().unwrap(), 0);
}

#[test]
fn test_set_commands_use_key_directly() {
    let (store, client) = recording_client();
    let s = client.set("tags").unwrap();

    s.add("x").unwrap();
    s.contains("x").unwrap();
    s.size().unwrap();

    assert_eq!(store.take(), vec!["SADD tags x", "SISMEMBER tags x", "SCARD tags"]);
}

// =============================================================================
// Set Arithmetic Tests
// =============================================================================

#[test]
fn test_set_difference_and_union() {
    let (_store, client) = memory_client();
    let s1 = client.set(unique_key()).unwrap();
    let s2 = client.set(unique_key()).unwrap();
    s1.add("foo").unwrap();
    s1.add("bar").unwrap();
    s2.add("bar").unwrap();

    assert_eq!(s1.difference(&s2).unwrap(), bytes_set(&["foo"]));
    assert_eq!(s1.union(&s2).unwrap(), bytes_set(&["foo", "bar"]));
}

#[test]
fn test_set_arithmetic_does_not_persist() {
    let (store, client) = memory_client();
    let s1 = client.set(unique_key()).unwrap();
    let s2 = client.set(unique_key()).unwrap();
    s1.add("a").unwrap();
    s2.add("b").unwrap();
    let keys_before = store.key_count();

    s1.union(&s2).unwrap();
    s1.difference(&s2).unwrap();

    assert_eq!(store.key_count(), keys_before);
    assert_eq!(s1.members().unwrap(), bytes_set(&["a"]));
}

#[test]
fn test_set_arithmetic_with_missing_other() {
    let (_store, client) = memory_client();
    let s1 = client.set(unique_key()).unwrap();
    let empty = client.set(unique_key()).unwrap();
    s1.add("only").unwrap();

    assert_eq!(s1.difference(&empty).unwrap(), bytes_set(&["only"]));
    assert_eq!(empty.difference(&s1).unwrap(), HashSet::new());
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_set_iterate_yields_all_members() {
    let (_store, client) = memory_client();
    let s = client.set(unique_key()).unwrap();
    for i in 0..37 {
        s.add(format!("m{}", i)).unwrap();
    }

    let seen: HashSet<Bytes> = s.iterate().map(|m| m.unwrap()).collect();

    assert_eq!(seen, s.members().unwrap());
}

#[test]
fn test_set_iterator_from_factory() {
    let (_store, client) = memory_client();
    let name = unique_key();
    let s = client.set(name.clone()).unwrap();
    s.add(3).unwrap();
    s.add(4).unwrap();
    s.add(5).unwrap();

    let seen: HashSet<Bytes> = client
        .set_iterator(name)
        .unwrap()
        .map(|m| m.unwrap())
        .collect();

    assert_eq!(seen, bytes_set(&["3", "4", "5"]));
}

#[test]
fn test_set_iterate_empty() {
    let (_store, client) = memory_client();
    let s = client.set(unique_key()).unwrap();

    assert_eq!(s.iterate().count(), 0);
}

#[test]
fn test_set_iterate_with_concurrent_additions() {
    let (_store, client) = memory_client();
    let s = client.set(unique_key()).unwrap();
    let original: HashSet<Bytes> = (0..40).map(|i| Bytes::from(format!("m{:02}", i))).collect();
    for member in &original {
        s.add(member).unwrap();
    }

    let mut iter = s.iterate();
    let mut seen = HashSet::new();
    seen.insert(iter.next().unwrap().unwrap());

    // Added mid-scan: may or may not show up
    s.add("a-new").unwrap();
    s.add("z-new").unwrap();

    for member in iter {
        seen.insert(member.unwrap());
    }

    // Every member present for the whole scan was produced
    assert!(original.is_subset(&seen));
    assert!(seen.len() <= original.len() + 2);
}

#[test]
fn test_set_iterate_uses_sscan() {
    let (store, client) = recording_client();
    let s = client.set("tags").unwrap();
    s.add("x").unwrap();
    store.take();

    let all: Vec<_> = s.iterate().collect();

    assert_eq!(all.len(), 1);
    assert_eq!(store.take(), vec!["SSCAN tags 0 COUNT 10"]);
}
