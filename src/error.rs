//! Error types for kvstructs
//!
//! Provides a unified error type for all adapter operations.
//!
//! Absent values (missing dictionary field, out-of-range list read, empty
//! queue) are never errors; they come back as `None` or a dedicated enum.

use thiserror::Error;

/// Result type alias using StructsError
pub type Result<T> = std::result::Result<T, StructsError>;

/// Unified error type for kvstructs operations
#[derive(Debug, Error)]
pub enum StructsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// Error reply sent by the store
    #[error("Store error: {0}")]
    Server(String),

    /// Operation against a key holding the wrong kind of value
    #[error("Wrong type: {0}")]
    WrongType(String),

    /// List index outside the current bounds (or list missing)
    #[error("Index out of range")]
    IndexOutOfRange,

    #[error("Unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: String, reply: String },

    #[error("Value is not an integer: {0}")]
    InvalidInteger(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StructsError {
    /// Classify an error reply message from the store
    pub fn from_server_message(message: &str) -> Self {
        if message.starts_with("WRONGTYPE") {
            StructsError::WrongType(message.to_string())
        } else if message == "ERR index out of range" || message == "ERR no such key" {
            StructsError::IndexOutOfRange
        } else {
            StructsError::Server(message.to_string())
        }
    }

    /// True for failures that leave a connection unusable
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            StructsError::Io(_) | StructsError::Connection(_) | StructsError::Protocol(_)
        )
    }
}
