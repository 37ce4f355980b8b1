//! Network Module
//!
//! TCP access to the store.
//!
//! ## Architecture
//! - `Connection`: one blocking socket, buffered, one request in flight
//! - `ConnectionPool`: shared handle, checks connections out per command

mod connection;
mod pool;

pub use connection::Connection;
pub use pool::ConnectionPool;
