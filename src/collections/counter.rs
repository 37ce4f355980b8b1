//! Counter adapter
//!
//! One integer-valued string key plus a locally cached copy of the last value
//! this adapter observed.
//!
//! ## Caching
//! [`Counter::value`] formats the cached value; it is refreshed only by this
//! adapter's own increments and decrements (or an explicit
//! [`Counter::refresh`]). Other clients' updates are not seen until then.
//!
//! ## Lifecycle
//! Opening initialises an absent key to `0` via `EXISTS` then `SET`, which
//! races with other openers (harmless: both write `0`, but a concurrent
//! increment landing between the two steps is lost). Dropping a `Counter`
//! never deletes the key; call [`Counter::dispose`] to do that deliberately.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use bytes::Bytes;

use super::{Collection, CollectionHandle};
use crate::error::{Result, StructsError};
use crate::protocol::Command;

/// Store-side counter with a read-your-own-writes cache
#[derive(Debug)]
pub struct Counter {
    handle: CollectionHandle,
    cached: AtomicI64,
}

impl Collection for Counter {
    const DEFAULT_KEY: &'static str = "counter";

    fn open(handle: CollectionHandle) -> Result<Self> {
        let key = handle.key().to_string();

        let exists = handle
            .execute(&Command::new("EXISTS").arg(&key))?
            .into_integer("EXISTS")?
            > 0;
        if !exists {
            tracing::debug!("Initialising counter {} to 0", key);
            handle
                .execute(&Command::new("SET").arg(&key).arg(0))?
                .into_status("SET")?;
        }

        let counter = Self {
            handle,
            cached: AtomicI64::new(0),
        };
        counter.refresh()?;
        Ok(counter)
    }

    fn handle(&self) -> &CollectionHandle {
        &self.handle
    }
}

impl Counter {
    /// Add one at the store; returns the new value zero-padded to `padding` digits
    pub fn increment(&self, padding: usize) -> Result<String> {
        self.adjust("INCR", padding)
    }

    /// Subtract one at the store; returns the new value zero-padded to `padding` digits
    pub fn decrement(&self, padding: usize) -> Result<String> {
        self.adjust("DECR", padding)
    }

    /// Cached value, zero-padded to `padding` digits (no store round trip)
    pub fn value(&self, padding: usize) -> String {
        pad(self.get(), padding)
    }

    /// Cached value as an integer
    pub fn get(&self) -> i64 {
        self.cached.load(Ordering::Acquire)
    }

    /// Read the live value from the store and update the cache
    ///
    /// A missing key (deleted by someone else) reads as 0.
    pub fn refresh(&self) -> Result<i64> {
        let raw = self
            .handle
            .execute(&Command::new("GET").arg(self.key()))?
            .into_bulk("GET")?;
        let value = match raw {
            Some(raw) => parse_counter(&raw)?,
            None => 0,
        };
        self.cached.store(value, Ordering::Release);
        Ok(value)
    }

    /// Delete the backing key; the adapter is consumed
    pub fn dispose(self) -> Result<bool> {
        tracing::debug!("Disposing counter {}", self.key());
        self.handle
            .execute(&Command::new("DEL").arg(self.key()))?
            .into_bool("DEL")
    }

    fn adjust(&self, name: &str, padding: usize) -> Result<String> {
        let value = self
            .handle
            .execute(&Command::new(name).arg(self.key()))?
            .into_integer(name)?;
        self.cached.store(value, Ordering::Release);
        Ok(pad(value, padding))
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Zero-padded decimal; wider values are never truncated
fn pad(value: i64, width: usize) -> String {
    format!("{:0width$}", value, width = width)
}

fn parse_counter(raw: &Bytes) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| StructsError::InvalidInteger(String::from_utf8_lossy(raw).into_owned()))
}
