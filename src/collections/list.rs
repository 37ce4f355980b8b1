//! List adapter
//!
//! One store list value, addressed by index. Negative indices count from the
//! tail as the store defines them.

use bytes::Bytes;

use super::{Collection, CollectionHandle};
use crate::error::Result;
use crate::iter::ListIter;
use crate::keyspace::IntoValue;
use crate::protocol::Command;

/// Ordered list allowing duplicates
#[derive(Debug, Clone)]
pub struct List {
    handle: CollectionHandle,
}

impl Collection for List {
    const DEFAULT_KEY: &'static str = "list";

    fn open(handle: CollectionHandle) -> Result<Self> {
        Ok(Self { handle })
    }

    fn handle(&self) -> &CollectionHandle {
        &self.handle
    }
}

impl List {
    /// Push at the tail; returns the new length
    pub fn append(&self, value: impl IntoValue) -> Result<usize> {
        let len = self
            .handle
            .execute(&Command::new("RPUSH").arg(self.key()).arg(value))?
            .into_integer("RPUSH")?;
        Ok(len.max(0) as usize)
    }

    /// Overwrite the element at `index`
    ///
    /// This replaces, it does not shift. Fails with
    /// [`IndexOutOfRange`](crate::StructsError::IndexOutOfRange) outside the
    /// current bounds.
    pub fn insert_at(&self, index: i64, value: impl IntoValue) -> Result<()> {
        self.set(index, value)
    }

    /// Overwrite the element at `index`; out of bounds is an error
    pub fn set(&self, index: i64, value: impl IntoValue) -> Result<()> {
        self.handle
            .execute(&Command::new("LSET").arg(self.key()).arg(index).arg(value))?
            .into_status("LSET")?;
        Ok(())
    }

    /// Element at `index`, `None` when out of range
    pub fn get(&self, index: i64) -> Result<Option<Bytes>> {
        self.handle
            .execute(&Command::new("LINDEX").arg(self.key()).arg(index))?
            .into_bulk("LINDEX")
    }

    /// Remove occurrences of the value currently at `index`
    ///
    /// Two steps: `LINDEX` reads the value, then `LREM` removes it by value
    /// with `index` as the count, so index 0 removes every occurrence and
    /// index `n` removes the first `n` from the head (negative: from the
    /// tail). Not atomic: if the list changes between the steps the wrong
    /// element(s) may go. Returns how many were removed; an absent index
    /// removes nothing.
    pub fn pop_at(&self, index: i64) -> Result<usize> {
        let Some(value) = self.get(index)? else {
            return Ok(0);
        };

        let removed = self
            .handle
            .execute(&Command::new("LREM").arg(self.key()).arg(index).arg(value))?
            .into_integer("LREM")?;
        Ok(removed.max(0) as usize)
    }

    pub fn contains(&self, value: impl IntoValue) -> Result<bool> {
        Ok(self.position(value)?.is_some())
    }

    /// Index of the first element equal to `value`
    pub fn position(&self, value: impl IntoValue) -> Result<Option<usize>> {
        let reply = self
            .handle
            .execute(&Command::new("LPOS").arg(self.key()).arg(value))?;
        if reply.is_nil() {
            return Ok(None);
        }
        Ok(Some(reply.into_integer("LPOS")?.max(0) as usize))
    }

    pub fn length(&self) -> Result<usize> {
        let len = self
            .handle
            .execute(&Command::new("LLEN").arg(self.key()))?
            .into_integer("LLEN")?;
        Ok(len.max(0) as usize)
    }

    /// Index walk over the current contents; see [`ListIter`]
    pub fn iterate(&self) -> Result<ListIter> {
        ListIter::new(self.handle.store().clone(), self.key())
    }
}
