//! Store Module
//!
//! The command channel every adapter talks through.
//!
//! ## Backends
//! - [`ConnectionPool`](crate::network::ConnectionPool): a remote store over TCP
//! - `MemoryStore` (feature `memory`): in-process, same command semantics,
//!   for tests and embedding without a server

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryStore, Session, DATABASES};

use crate::error::Result;
use crate::protocol::{Command, Reply};

/// A shared handle able to run store commands
///
/// Implementations must be safe to call from many threads at once. Each call
/// is one request/response round trip; error replies surface as `Err`.
pub trait Store: Send + Sync {
    /// Execute one command and return its reply
    fn execute(&self, command: &Command) -> Result<Reply>;
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn execute(&self, command: &Command) -> Result<Reply> {
        (**self).execute(command)
    }
}
