//! Connection Pool
//!
//! The thread-safe shared store handle.
//!
//! ## Strategy
//! - Idle connections sit in a lock-free `ArrayQueue`
//! - Each command checks one out, runs a single round trip, and hands it back
//! - When none is idle a new connection is dialled; surplus ones are dropped
//! - A connection that failed at the transport level is never returned
//!
//! A blocking pop therefore ties up only the connection it runs on.

use crossbeam::queue::ArrayQueue;

use crate::config::Config;
use crate::error::Result;
use crate::network::Connection;
use crate::protocol::{Command, Reply};
use crate::store::Store;

/// Pool of connections to one store/database
pub struct ConnectionPool {
    /// Parameters used for every dial
    config: Config,

    /// Connections ready for reuse
    idle: ArrayQueue<Connection>,
}

impl ConnectionPool {
    /// Create the pool and dial its first connection
    ///
    /// Dialling eagerly makes an unreachable store fail here rather than on
    /// the first adapter call.
    pub fn connect(config: Config) -> Result<Self> {
        let first = Connection::open(&config)?;
        let pool = Self::lazy(config);
        let _ = pool.idle.push(first);
        Ok(pool)
    }

    /// Create the pool without dialling
    pub fn lazy(config: Config) -> Self {
        let capacity = config.max_idle_connections.max(1);
        Self {
            config,
            idle: ArrayQueue::new(capacity),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of connections currently idle
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    fn checkout(&self) -> Result<Connection> {
        match self.idle.pop() {
            Some(connection) => Ok(connection),
            None => {
                tracing::debug!("No idle connection, dialling {}", self.config.addr());
                Connection::open(&self.config)
            }
        }
    }

    fn checkin(&self, connection: Connection) {
        // Full queue: the surplus connection is simply closed
        let _ = self.idle.push(connection);
    }
}

impl Store for ConnectionPool {
    fn execute(&self, command: &Command) -> Result<Reply> {
        let mut connection = self.checkout()?;

        match connection.execute(command) {
            Ok(reply) => {
                self.checkin(connection);
                Ok(reply)
            }
            Err(e) if e.is_connection_fatal() => {
                tracing::warn!(
                    "Discarding connection to {} after {}: {}",
                    connection.peer_addr(),
                    command.name(),
                    e
                );
                Err(e)
            }
            Err(e) => {
                // Error replies leave the connection in sync
                self.checkin(connection);
                Err(e)
            }
        }
    }
}
