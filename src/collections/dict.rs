//! Dictionary adapter
//!
//! Each field `f` of collection `k` is its own string key `k:f`.

use bytes::Bytes;

use super::{Collection, CollectionHandle};
use crate::error::Result;
use crate::iter::{ItemIter, KeyIter, ValueIter};
use crate::keyspace::{field_key, field_pattern, IntoValue};
use crate::protocol::Command;

/// Result of [`Dict::get_or_false`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLookup {
    /// The field did not exist (the "false" sentinel)
    Missing,

    /// The field existed; `None` means it was deleted between the existence
    /// check and the read
    Value(Option<Bytes>),
}

impl FieldLookup {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldLookup::Missing)
    }

    /// The value, if one was read
    pub fn into_value(self) -> Option<Bytes> {
        match self {
            FieldLookup::Value(value) => value,
            FieldLookup::Missing => None,
        }
    }
}

/// Dictionary over namespaced string keys
#[derive(Debug, Clone)]
pub struct Dict {
    handle: CollectionHandle,
}

impl Collection for Dict {
    const DEFAULT_KEY: &'static str = "dict";

    fn open(handle: CollectionHandle) -> Result<Self> {
        Ok(Self { handle })
    }

    fn handle(&self) -> &CollectionHandle {
        &self.handle
    }
}

impl Dict {
    /// Physical key of `field`
    pub fn field_key(&self, field: &str) -> String {
        field_key(self.handle.key(), field)
    }

    /// Write `value` at `field`; returns the written value
    pub fn set(&self, field: &str, value: impl IntoValue) -> Result<Bytes> {
        let value = value.into_value();
        self.handle
            .execute(&Command::new("SET").arg(self.field_key(field)).arg(&value))?
            .into_status("SET")?;
        Ok(value)
    }

    /// Value at `field`, `None` when unset
    pub fn get(&self, field: &str) -> Result<Option<Bytes>> {
        self.handle
            .execute(&Command::new("GET").arg(self.field_key(field)))?
            .into_bulk("GET")
    }

    pub fn exists(&self, field: &str) -> Result<bool> {
        let count = self
            .handle
            .execute(&Command::new("EXISTS").arg(self.field_key(field)))?
            .into_integer("EXISTS")?;
        Ok(count > 0)
    }

    /// Same check as [`exists`](Self::exists)
    pub fn contains(&self, field: &str) -> Result<bool> {
        self.exists(field)
    }

    /// Remove `field`; absent fields are fine. Returns whether anything was removed
    pub fn delete(&self, field: &str) -> Result<bool> {
        self.handle
            .execute(&Command::new("DEL").arg(self.field_key(field)))?
            .into_bool("DEL")
    }

    /// Physical keys of fields matching `pattern` (`"*"` for all)
    ///
    /// Uses incremental `SCAN`, never a blocking full listing. Note the scan
    /// walks the whole keyspace and filters by `{key}:{pattern}`.
    pub fn keys(&self, pattern: &str) -> KeyIter {
        KeyIter::keys(
            self.handle.store().clone(),
            field_pattern(self.handle.key(), pattern),
            self.handle.scan_count(),
        )
    }

    /// Values of fields matching `pattern`
    ///
    /// Not atomic: a field deleted after it was scanned is skipped.
    pub fn values(&self, pattern: &str) -> ValueIter {
        ValueIter::new(self.handle.store().clone(), self.keys(pattern))
    }

    /// `(physical key, value)` pairs of fields matching `pattern`
    ///
    /// Same skipping rule as [`values`](Self::values).
    pub fn items(&self, pattern: &str) -> ItemIter {
        ItemIter::new(self.handle.store().clone(), self.keys(pattern))
    }

    /// Value of `field`, or [`FieldLookup::Missing`] when it does not exist
    ///
    /// Lets callers tell "holds an empty value" from "never set". Two round
    /// trips (`EXISTS` then `GET`); a concurrent delete in between yields
    /// `FieldLookup::Value(None)`.
    pub fn get_or_false(&self, field: &str) -> Result<FieldLookup> {
        if !self.exists(field)? {
            return Ok(FieldLookup::Missing);
        }
        Ok(FieldLookup::Value(self.get(field)?))
    }
}
