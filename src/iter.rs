//! Cursor Iterators
//!
//! Lazy, forward-only enumeration of remote collections. Each iterator is
//! created by one call and cannot be rewound; ask the adapter again for a
//! fresh pass.
//!
//! ## Consistency
//! Nothing is locked or consumed while iterating. Under concurrent mutation:
//! - scans ([`ScanIter`]) may repeat an entry or miss one that was added or
//!   removed mid-scan, but never miss an entry present for the whole scan
//! - [`ListIter`] walks indices, so a list shrinking underneath it ends the
//!   walk early and a list growing past the length read at start is cut off
//!
//! After an error the iterator yields that error once and then ends.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::Command;
use crate::store::Store;

// =============================================================================
// Scan Cursor
// =============================================================================

/// What a scan walks over
#[derive(Debug, Clone)]
enum ScanTarget {
    /// The whole keyspace (`SCAN`)
    Keys,

    /// Members of one set (`SSCAN`)
    Members(String),
}

/// Incremental scan over keys or set members
///
/// Each batch is one non-blocking round trip; batches may be empty before the
/// scan finishes.
pub struct ScanIter {
    store: Arc<dyn Store>,
    target: ScanTarget,
    pattern: Option<String>,
    count: usize,

    /// Server cursor for the next batch (`0` once the scan is complete)
    cursor: u64,
    buffer: VecDeque<Bytes>,
    done: bool,
}

/// Keys matched by a keyspace scan
pub type KeyIter = ScanIter;

/// Members of a set, fetched incrementally
pub type SetIter = ScanIter;

impl ScanIter {
    /// Scan the keyspace for keys matching `pattern`
    pub fn keys(store: Arc<dyn Store>, pattern: impl Into<String>, count: usize) -> Self {
        Self::new(store, ScanTarget::Keys, Some(pattern.into()), count)
    }

    /// Scan the members of the set at `key`
    pub fn members(store: Arc<dyn Store>, key: impl Into<String>, count: usize) -> Self {
        Self::new(store, ScanTarget::Members(key.into()), None, count)
    }

    fn new(
        store: Arc<dyn Store>,
        target: ScanTarget,
        pattern: Option<String>,
        count: usize,
    ) -> Self {
        Self {
            store,
            target,
            pattern,
            count: count.max(1),
            cursor: 0,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    fn batch_command(&self) -> Command {
        let mut command = match &self.target {
            ScanTarget::Keys => Command::new("SCAN").arg(self.cursor),
            ScanTarget::Members(key) => Command::new("SSCAN").arg(key).arg(self.cursor),
        };
        if let Some(pattern) = &self.pattern {
            command = command.arg("MATCH").arg(pattern);
        }
        command.arg("COUNT").arg(self.count)
    }

    fn fetch(&mut self) -> Result<()> {
        let command = self.batch_command();
        let name = command.name();
        let (cursor, batch) = self.store.execute(&command)?.into_scan(&name)?;

        tracing::trace!("{} batch of {} (next cursor {})", name, batch.len(), cursor);
        self.buffer.extend(batch);
        self.cursor = cursor;
        self.done = cursor == 0;
        Ok(())
    }
}

impl Iterator for ScanIter {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

// =============================================================================
// Dictionary Values / Items
// =============================================================================

/// Values of the keys produced by a key scan
///
/// Each value is a separate `GET` after the key was scanned. Keys deleted in
/// between are skipped rather than reported as gaps.
pub struct ValueIter {
    store: Arc<dyn Store>,
    keys: KeyIter,
}

impl ValueIter {
    pub fn new(store: Arc<dyn Store>, keys: KeyIter) -> Self {
        Self { store, keys }
    }
}

impl Iterator for ValueIter {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        next_item(&self.store, &mut self.keys).map(|r| r.map(|(_, value)| value))
    }
}

/// `(physical key, value)` pairs produced by a key scan
///
/// Same skipping rule as [`ValueIter`].
pub struct ItemIter {
    store: Arc<dyn Store>,
    keys: KeyIter,
}

impl ItemIter {
    pub fn new(store: Arc<dyn Store>, keys: KeyIter) -> Self {
        Self { store, keys }
    }
}

impl Iterator for ItemIter {
    type Item = Result<(Bytes, Bytes)>;

    fn next(&mut self) -> Option<Self::Item> {
        next_item(&self.store, &mut self.keys)
    }
}

fn next_item(store: &Arc<dyn Store>, keys: &mut KeyIter) -> Option<Result<(Bytes, Bytes)>> {
    loop {
        let key = match keys.next()? {
            Ok(key) => key,
            Err(e) => return Some(Err(e)),
        };

        let value = store
            .execute(&Command::new("GET").arg(&key))
            .and_then(|reply| reply.into_bulk("GET"));
        match value {
            Ok(Some(value)) => return Some(Ok((key, value))),
            Ok(None) => {
                tracing::trace!("Key {:?} vanished during iteration", key);
                continue;
            }
            Err(e) => return Some(Err(e)),
        }
    }
}

// =============================================================================
// List Index Walk
// =============================================================================

/// Index-driven walk over a list
///
/// The length is read once at construction; the walk then reads one index
/// per call and stops at that length or at the first absent index.
pub struct ListIter {
    store: Arc<dyn Store>,
    key: String,
    index: usize,
    end: usize,
    done: bool,
}

impl ListIter {
    /// Read the current length and position at index 0
    pub fn new(store: Arc<dyn Store>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let end = store
            .execute(&Command::new("LLEN").arg(&key))?
            .into_integer("LLEN")?;

        Ok(Self {
            store,
            key,
            index: 0,
            end: end.max(0) as usize,
            done: false,
        })
    }

    /// Length observed when the walk started
    pub fn expected_len(&self) -> usize {
        self.end
    }
}

impl Iterator for ListIter {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.index >= self.end {
            return None;
        }

        let value = self
            .store
            .execute(&Command::new("LINDEX").arg(&self.key).arg(self.index))
            .and_then(|reply| reply.into_bulk("LINDEX"));
        self.index += 1;

        match value {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
