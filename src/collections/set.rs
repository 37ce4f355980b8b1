//! Set adapter
//!
//! One store set value; every operation is a single command.

use std::collections::HashSet;

use bytes::Bytes;

use super::{Collection, CollectionHandle};
use crate::error::Result;
use crate::iter::SetIter;
use crate::keyspace::IntoValue;
use crate::protocol::Command;

/// Unordered set of byte-string members
#[derive(Debug, Clone)]
pub struct Set {
    handle: CollectionHandle,
}

impl Collection for Set {
    const DEFAULT_KEY: &'static str = "set";

    fn open(handle: CollectionHandle) -> Result<Self> {
        Ok(Self { handle })
    }

    fn handle(&self) -> &CollectionHandle {
        &self.handle
    }
}

impl Set {
    /// Add `value`; true if it was not already a member
    pub fn add(&self, value: impl IntoValue) -> Result<bool> {
        self.handle
            .execute(&Command::new("SADD").arg(self.key()).arg(value))?
            .into_bool("SADD")
    }

    /// Remove `value`; true if it was a member
    pub fn remove(&self, value: impl IntoValue) -> Result<bool> {
        self.handle
            .execute(&Command::new("SREM").arg(self.key()).arg(value))?
            .into_bool("SREM")
    }

    pub fn contains(&self, value: impl IntoValue) -> Result<bool> {
        self.handle
            .execute(&Command::new("SISMEMBER").arg(self.key()).arg(value))?
            .into_bool("SISMEMBER")
    }

    /// Cardinality
    pub fn size(&self) -> Result<usize> {
        let count = self
            .handle
            .execute(&Command::new("SCARD").arg(self.key()))?
            .into_integer("SCARD")?;
        Ok(count.max(0) as usize)
    }

    /// Every member in one reply
    ///
    /// The whole set is held in memory on both ends; prefer
    /// [`iterate`](Self::iterate) for large sets.
    pub fn members(&self) -> Result<HashSet<Bytes>> {
        let members = self
            .handle
            .execute(&Command::new("SMEMBERS").arg(self.key()))?
            .into_bytes_vec("SMEMBERS")?;
        Ok(members.into_iter().collect())
    }

    /// Incremental `SSCAN` over the members
    pub fn iterate(&self) -> SetIter {
        SetIter::members(
            self.handle.store().clone(),
            self.key(),
            self.handle.scan_count(),
        )
    }

    /// Members of either set, computed by the store; nothing is persisted
    pub fn union(&self, other: &Set) -> Result<HashSet<Bytes>> {
        self.combine("SUNION", other)
    }

    /// Members of `self` not in `other`; nothing is persisted
    pub fn difference(&self, other: &Set) -> Result<HashSet<Bytes>> {
        self.combine("SDIFF", other)
    }

    fn combine(&self, name: &str, other: &Set) -> Result<HashSet<Bytes>> {
        let members = self
            .handle
            .execute(&Command::new(name).arg(self.key()).arg(other.key()))?
            .into_bytes_vec(name)?;
        Ok(members.into_iter().collect())
    }
}
