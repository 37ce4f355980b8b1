//! Client
//!
//! Connection provider and collection factory.
//!
//! A `Client` is built once by the application from a [`Config`] and passed
//! to whatever needs collections. The store handle behind it is created on
//! first use and then shared by every adapter the client hands out:
//!
//! ```no_run
//! use kvstructs::{Client, Config};
//!
//! let client = Client::new(Config::builder().host("localhost").port(6379).build());
//! let sessions = client.dictionary("sessions")?;
//! sessions.set("ann", "token-1")?;
//! # Ok::<(), kvstructs::StructsError>(())
//! ```

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::collections::{Collection, CollectionHandle, Counter, Dict, List, Queue, Set};
use crate::config::Config;
use crate::error::Result;
use crate::iter::{ListIter, SetIter};
use crate::network::ConnectionPool;
use crate::protocol::Command;
use crate::store::Store;

/// Shared store access plus adapter construction
pub struct Client {
    config: Config,

    /// Initialised exactly once, even under concurrent first use
    store: OnceCell<Arc<dyn Store>>,
}

impl Client {
    /// Client for the store described by `config`; nothing is dialled yet
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: OnceCell::new(),
        }
    }

    /// Client over an existing store handle (e.g. an in-process `MemoryStore`)
    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Self {
        Self {
            config,
            store: OnceCell::with_value(store),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared store handle, connecting on first call
    ///
    /// Concurrent first callers block until one of them has connected and all
    /// receive the same handle. A failed connect leaves the client
    /// unconnected so a later call can try again.
    pub fn store(&self) -> Result<Arc<dyn Store>> {
        let store = self.store.get_or_try_init(|| {
            tracing::debug!("Connecting to store at {}", self.config.addr());
            let pool = ConnectionPool::connect(self.config.clone())?;
            Ok::<Arc<dyn Store>, crate::StructsError>(Arc::new(pool))
        })?;
        Ok(Arc::clone(store))
    }

    /// Round trip to check the store answers
    pub fn ping(&self) -> Result<()> {
        self.store()?
            .execute(&Command::new("PING"))?
            .into_bulk("PING")?;
        Ok(())
    }

    // =========================================================================
    // Factory
    // =========================================================================

    /// Handle for `key` on the shared store
    pub fn handle(&self, key: impl Into<String>) -> Result<CollectionHandle> {
        Ok(CollectionHandle::new(self.store()?, key).with_scan_count(self.config.scan_count))
    }

    /// Any adapter type, by name
    pub fn collection<C: Collection>(&self, key: impl Into<String>) -> Result<C> {
        C::open(self.handle(key)?)
    }

    /// Any adapter type under its default name
    pub fn default_collection<C: Collection>(&self) -> Result<C> {
        self.collection(C::DEFAULT_KEY)
    }

    pub fn dictionary(&self, key: impl Into<String>) -> Result<Dict> {
        self.collection(key)
    }

    pub fn set(&self, key: impl Into<String>) -> Result<Set> {
        self.collection(key)
    }

    pub fn list(&self, key: impl Into<String>) -> Result<List> {
        self.collection(key)
    }

    pub fn queue(&self, key: impl Into<String>) -> Result<Queue> {
        self.collection(key)
    }

    /// Opens (and if needed initialises) the counter at `key`
    pub fn counter(&self, key: impl Into<String>) -> Result<Counter> {
        self.collection(key)
    }

    /// Incremental scan over the set at `key`
    pub fn set_iterator(&self, key: impl Into<String>) -> Result<SetIter> {
        Ok(self.set(key)?.iterate())
    }

    /// Index walk over the list at `key`
    pub fn list_iterator(&self, key: impl Into<String>) -> Result<ListIter> {
        self.list(key)?.iterate()
    }
}
