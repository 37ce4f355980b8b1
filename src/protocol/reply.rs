//! Reply definitions
//!
//! Represents replies from the store, plus the conversions adapters use to
//! interpret them. Conversions take the command name so a shape mismatch can
//! say which command produced it.

use std::fmt;

use bytes::Bytes;

use crate::error::{Result, StructsError};

/// A RESP2 reply value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status line, e.g. `OK`
    Status(String),

    /// Error line, e.g. `ERR index out of range`
    Error(String),

    /// Integer reply
    Integer(i64),

    /// Bulk string (`None` is nil)
    Bulk(Option<Bytes>),

    /// Array of replies (`None` is a nil array)
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// `+OK`
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// `$-1`
    pub fn nil() -> Self {
        Reply::Bulk(None)
    }

    /// Bulk string reply from anything byte-like
    pub fn bulk(value: impl Into<Bytes>) -> Self {
        Reply::Bulk(Some(value.into()))
    }

    /// Array of bulk strings
    pub fn bulk_array<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        Reply::Array(Some(values.into_iter().map(|v| Reply::Bulk(Some(v))).collect()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Bulk(None) | Reply::Array(None))
    }

    /// Turn an error reply into `Err`, pass everything else through
    pub fn into_result(self) -> Result<Reply> {
        match self {
            Reply::Error(message) => Err(StructsError::from_server_message(&message)),
            other => Ok(other),
        }
    }

    // =========================================================================
    // Typed Conversions
    // =========================================================================

    pub fn into_integer(self, command: &str) -> Result<i64> {
        match self {
            Reply::Integer(n) => Ok(n),
            other => Err(other.unexpected(command)),
        }
    }

    /// Integer reply interpreted as a flag (non-zero = true)
    pub fn into_bool(self, command: &str) -> Result<bool> {
        self.into_integer(command).map(|n| n != 0)
    }

    /// Bulk string or nil
    pub fn into_bulk(self, command: &str) -> Result<Option<Bytes>> {
        match self {
            Reply::Bulk(value) => Ok(value),
            Reply::Status(s) => Ok(Some(Bytes::from(s))),
            other => Err(other.unexpected(command)),
        }
    }

    /// Array elements (nil array becomes empty)
    pub fn into_array(self, command: &str) -> Result<Vec<Reply>> {
        match self {
            Reply::Array(items) => Ok(items.unwrap_or_default()),
            other => Err(other.unexpected(command)),
        }
    }

    /// Array of non-nil bulk strings
    pub fn into_bytes_vec(self, command: &str) -> Result<Vec<Bytes>> {
        self.into_array(command)?
            .into_iter()
            .map(|item| match item {
                Reply::Bulk(Some(bytes)) => Ok(bytes),
                other => Err(other.unexpected(command)),
            })
            .collect()
    }

    pub fn into_status(self, command: &str) -> Result<String> {
        match self {
            Reply::Status(s) => Ok(s),
            other => Err(other.unexpected(command)),
        }
    }

    /// `[cursor, [elements...]]` as returned by the scan family
    pub fn into_scan(self, command: &str) -> Result<(u64, Vec<Bytes>)> {
        let mut parts = self.into_array(command)?.into_iter();
        let (cursor, batch) = match (parts.next(), parts.next(), parts.next()) {
            (Some(cursor), Some(batch), None) => (cursor, batch),
            _ => {
                return Err(StructsError::UnexpectedReply {
                    command: command.to_string(),
                    reply: "scan reply without exactly two parts".to_string(),
                })
            }
        };

        let cursor = match cursor.into_bulk(command)? {
            Some(raw) => parse_u64(&raw).ok_or_else(|| StructsError::UnexpectedReply {
                command: command.to_string(),
                reply: format!("bad cursor {:?}", raw),
            })?,
            None => {
                return Err(StructsError::UnexpectedReply {
                    command: command.to_string(),
                    reply: "nil cursor".to_string(),
                })
            }
        };

        Ok((cursor, batch.into_bytes_vec(command)?))
    }

    fn unexpected(self, command: &str) -> StructsError {
        match self {
            Reply::Error(message) => StructsError::from_server_message(&message),
            other => StructsError::UnexpectedReply {
                command: command.to_string(),
                reply: other.to_string(),
            },
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(s) => write!(f, "+{}", s),
            Reply::Error(e) => write!(f, "-{}", e),
            Reply::Integer(n) => write!(f, ":{}", n),
            Reply::Bulk(Some(b)) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            Reply::Bulk(None) | Reply::Array(None) => write!(f, "(nil)"),
            Reply::Array(Some(items)) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn parse_u64(raw: &[u8]) -> Option<u64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}
