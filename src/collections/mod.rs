//! Collection Adapters
//!
//! Five independent adapters, each binding one logical collection name to the
//! shared store handle and translating collection-style calls into commands.
//!
//! ## Command Mapping
//! ```text
//! Dict     set/get/exists/delete   SET/GET/EXISTS/DEL on "{key}:{field}"
//!          keys/values/items       SCAN MATCH "{key}:{pattern}" (+ GET)
//! Set      add/remove/contains     SADD/SREM/SISMEMBER
//!          size/members/iterate    SCARD/SMEMBERS/SSCAN
//!          union/difference        SUNION/SDIFF
//! List     append/get/set          RPUSH/LINDEX/LSET
//!          pop_at                  LINDEX then LREM          (two steps)
//!          contains/length         LPOS/LLEN
//! Queue    add/get                 LPUSH/BRPOP               (FIFO)
//! Counter  open                    EXISTS, SET 0, GET        (three steps)
//!          increment/decrement     INCR/DECR
//! ```
//!
//! Multi-step operations are not atomic. Concurrent actors on the same key can
//! interleave between the steps; each adapter documents what that can cause.

mod dict;
mod set;
mod list;
mod queue;
mod counter;

pub use dict::{Dict, FieldLookup};
pub use set::Set;
pub use list::List;
pub use queue::{Queue, MAX_QUEUE_WAIT};
pub use counter::Counter;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::protocol::{Command, Reply};
use crate::store::Store;

/// Scan COUNT hint used when none is configured
pub const DEFAULT_SCAN_COUNT: usize = 10;

/// A collection name plus the store it lives in
///
/// Owns no data; it is only the capability to address part of the keyspace.
#[derive(Clone)]
pub struct CollectionHandle {
    key: String,
    store: Arc<dyn Store>,
    scan_count: usize,
}

impl CollectionHandle {
    pub fn new(store: Arc<dyn Store>, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            store,
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }

    /// Set the COUNT hint for scans started through this handle
    pub fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = count.max(1);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn scan_count(&self) -> usize {
        self.scan_count
    }

    pub(crate) fn execute(&self, command: &Command) -> Result<Reply> {
        self.store.execute(command)
    }
}

impl fmt::Debug for CollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("key", &self.key)
            .field("scan_count", &self.scan_count)
            .finish()
    }
}

/// Construction by name, shared by every adapter
pub trait Collection: Sized {
    /// Key used when the caller does not name the collection
    const DEFAULT_KEY: &'static str;

    /// Bind an adapter to the handle's key
    ///
    /// Only [`Counter`] talks to the store here.
    fn open(handle: CollectionHandle) -> Result<Self>;

    fn handle(&self) -> &CollectionHandle;

    /// The collection key
    fn key(&self) -> &str {
        self.handle().key()
    }
}
