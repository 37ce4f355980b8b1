//! # kvstructs
//!
//! Familiar collection types backed by a remote Redis-compatible key-value
//! store:
//! - `Dict`: namespaced string keys (`{collection}:{field}`)
//! - `Set`, `List`: native store sets and lists
//! - `Queue`: FIFO over a list with blocking, timeout-bounded pop
//! - `Counter`: integer key with a locally cached last value
//!
//! Every call is a synchronous round trip. There is no client-side locking:
//! single-command operations are atomic at the store, multi-step ones are not
//! (each adapter documents its races).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application code                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Client::dictionary / set / list / ...
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │        Collection Adapters  +  Cursor Iterators              │
//! │     (command mapping, key-space codec, reply decoding)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Store::execute(Command) -> Reply
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌──────────────┐          ┌─────────────┐
//!   │ConnectionPool│          │ MemoryStore │
//!   │ (RESP / TCP) │          │ (in-process)│
//!   └──────┬───────┘          └─────────────┘
//!          ▼
//!    remote store
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod keyspace;
pub mod protocol;
pub mod network;
pub mod store;
pub mod collections;
pub mod iter;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StructsError, Result};
pub use config::Config;
pub use client::Client;
pub use collections::{Collection, CollectionHandle, Counter, Dict, FieldLookup, List, Queue, Set};
pub use iter::{ItemIter, KeyIter, ListIter, ScanIter, SetIter, ValueIter};
pub use keyspace::IntoValue;
pub use network::ConnectionPool;
pub use store::Store;
#[cfg(feature = "memory")]
pub use store::MemoryStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvstructs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
