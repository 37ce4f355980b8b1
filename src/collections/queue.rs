//! Queue adapter
//!
//! A store list used as a FIFO: producers `LPUSH` at the head, consumers pop
//! from the tail. With a single producer items come out in the order they
//! went in; with several, each push is atomic and the order across producers
//! is whatever order the store applied them in.
//!
//! ## Timeouts
//! The store reads a `BRPOP` timeout of `0` as "wait forever". Here a zero
//! [`Duration`] passed to [`Queue::get`] polls once instead, so a wait is
//! always bounded unless the caller asks for [`Queue::get_forever`].
//! Waits longer than [`MAX_QUEUE_WAIT`] are shortened to it.

use std::time::Duration;

use bytes::Bytes;

use super::{Collection, CollectionHandle};
use crate::error::{Result, StructsError};
use crate::keyspace::IntoValue;
use crate::protocol::{Command, Reply, Wait};

/// Longest wait sent with a single `BRPOP` (about 136 years)
pub const MAX_QUEUE_WAIT: Duration = Duration::from_secs(u32::MAX as u64);

/// FIFO queue with blocking pop
#[derive(Debug, Clone)]
pub struct Queue {
    handle: CollectionHandle,
}

impl Collection for Queue {
    const DEFAULT_KEY: &'static str = "queue";

    fn open(handle: CollectionHandle) -> Result<Self> {
        Ok(Self { handle })
    }

    fn handle(&self) -> &CollectionHandle {
        &self.handle
    }
}

impl Queue {
    /// Enqueue `value`; returns the queue length after the push
    pub fn add(&self, value: impl IntoValue) -> Result<usize> {
        let len = self
            .handle
            .execute(&Command::new("LPUSH").arg(self.key()).arg(value))?
            .into_integer("LPUSH")?;
        Ok(len.max(0) as usize)
    }

    /// Dequeue, waiting up to `timeout` for an item
    ///
    /// `None` means nothing arrived in time. A zero timeout polls once.
    pub fn get(&self, timeout: Duration) -> Result<Option<Bytes>> {
        if timeout.is_zero() {
            return self.try_get();
        }
        let timeout = timeout.min(MAX_QUEUE_WAIT);

        let command = Command::new("BRPOP")
            .arg(self.key())
            .arg(format_seconds(timeout))
            .with_wait(Wait::Upto(timeout));
        self.blocking_pop(&command)
    }

    /// Dequeue, waiting with no time limit
    pub fn get_forever(&self) -> Result<Option<Bytes>> {
        let command = Command::new("BRPOP")
            .arg(self.key())
            .arg(0)
            .with_wait(Wait::Forever);
        self.blocking_pop(&command)
    }

    /// Dequeue without waiting
    pub fn try_get(&self) -> Result<Option<Bytes>> {
        self.handle
            .execute(&Command::new("RPOP").arg(self.key()))?
            .into_bulk("RPOP")
    }

    /// Current length; may be stale by the time the caller acts on it
    pub fn size(&self) -> Result<usize> {
        let len = self
            .handle
            .execute(&Command::new("LLEN").arg(self.key()))?
            .into_integer("LLEN")?;
        Ok(len.max(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    fn blocking_pop(&self, command: &Command) -> Result<Option<Bytes>> {
        let reply = self.handle.execute(command)?;
        if reply.is_nil() {
            return Ok(None);
        }

        // [key, value]
        let mut pair = reply.into_array("BRPOP")?;
        match (pair.pop(), pair.len()) {
            (Some(Reply::Bulk(value)), 1) => Ok(value),
            (other, _) => Err(StructsError::UnexpectedReply {
                command: "BRPOP".to_string(),
                reply: format!("{:?}", other),
            }),
        }
    }
}

/// Seconds with millisecond precision, rounded up so a tiny wait never
/// becomes the store's "forever"
fn format_seconds(timeout: Duration) -> String {
    let millis = (timeout.as_nanos() + 999_999) / 1_000_000;
    format!("{}.{:03}", millis / 1000, millis % 1000)
}
