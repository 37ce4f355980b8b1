//! Protocol codec
//!
//! Encoding and decoding functions for the RESP2 wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! *<parts>\r\n  then per part:  $<len>\r\n<bytes>\r\n
//! ```
//!
//! ### Reply Format
//! ```text
//! ┌────────┬──────────────────────────────┐
//! │Type (1)│ Line / length + payload      │
//! └────────┴──────────────────────────────┘
//! ```
//! Types: `+` status, `-` error, `:` integer, `$` bulk, `*` array.

use std::io::{BufRead, Cursor, Read, Write};

use bytes::Bytes;

use super::{Command, Reply};
use crate::error::{Result, StructsError};

/// Maximum bulk string size (512 MB, the store's own limit)
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Maximum elements in one array reply
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_DEPTH: usize = 32;

/// Maximum length of a single header line
const MAX_LINE_LEN: usize = 64 * 1024;

const CRLF: &[u8] = b"\r\n";

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: array header + one bulk string per part
pub fn encode_command(command: &Command) -> Vec<u8> {
    let parts = command.parts();
    let payload: usize = parts.iter().map(|p| p.len() + 16).sum();

    let mut message = Vec::with_capacity(16 + payload);
    push_header(&mut message, b'*', parts.len() as i64);
    for part in parts {
        push_bulk(&mut message, part);
    }

    message
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    read_command(&mut Cursor::new(bytes))
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply to bytes
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let mut message = Vec::new();
    push_reply(&mut message, reply);
    message
}

fn push_reply(out: &mut Vec<u8>, reply: &Reply) {
    match reply {
        Reply::Status(s) => push_line(out, b'+', s.as_bytes()),
        Reply::Error(e) => push_line(out, b'-', e.as_bytes()),
        Reply::Integer(n) => push_header(out, b':', *n),
        Reply::Bulk(Some(b)) => push_bulk(out, b),
        Reply::Bulk(None) => push_header(out, b'$', -1),
        Reply::Array(None) => push_header(out, b'*', -1),
        Reply::Array(Some(items)) => {
            push_header(out, b'*', items.len() as i64);
            for item in items {
                push_reply(out, item);
            }
        }
    }
}

/// Decode a reply from bytes
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    read_reply(&mut Cursor::new(bytes))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: BufRead>(reader: &mut R) -> Result<Command> {
    let parts = match read_reply(reader)? {
        Reply::Array(Some(items)) => items
            .into_iter()
            .map(|item| match item {
                Reply::Bulk(Some(bytes)) => Ok(bytes),
                other => Err(StructsError::Protocol(format!(
                    "command part is not a bulk string: {}",
                    other
                ))),
            })
            .collect::<Result<Vec<Bytes>>>()?,
        other => {
            return Err(StructsError::Protocol(format!(
                "command is not an array: {}",
                other
            )))
        }
    };

    Command::from_parts(parts)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete reply from a stream
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    read_reply_at_depth(reader, 0)
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    let bytes = encode_reply(reply);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

fn read_reply_at_depth<R: BufRead>(reader: &mut R, depth: usize) -> Result<Reply> {
    if depth > MAX_DEPTH {
        return Err(StructsError::Protocol(format!(
            "Nesting too deep (max {} levels)",
            MAX_DEPTH
        )));
    }

    let line = read_line(reader)?;
    let (marker, body) = match line.split_first() {
        Some((marker, body)) => (*marker, body),
        None => return Err(StructsError::Protocol("empty reply line".to_string())),
    };

    match marker {
        b'+' => Ok(Reply::Status(String::from_utf8_lossy(body).into_owned())),
        b'-' => Ok(Reply::Error(String::from_utf8_lossy(body).into_owned())),
        b':' => Ok(Reply::Integer(parse_int(body)?)),
        b'$' => {
            let len = parse_int(body)?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let len = len as usize;
            if len > MAX_BULK_LEN {
                return Err(StructsError::Protocol(format!(
                    "Bulk string too large: {} bytes (max {})",
                    len, MAX_BULK_LEN
                )));
            }

            // Payload plus trailing CRLF
            let mut payload = vec![0u8; len + 2];
            reader.read_exact(&mut payload)?;
            if &payload[len..] != CRLF {
                return Err(StructsError::Protocol(
                    "Bulk string not terminated by CRLF".to_string(),
                ));
            }
            payload.truncate(len);
            Ok(Reply::Bulk(Some(Bytes::from(payload))))
        }
        b'*' => {
            let len = parse_int(body)?;
            if len < 0 {
                return Ok(Reply::Array(None));
            }
            let len = len as usize;
            if len > MAX_ARRAY_LEN {
                return Err(StructsError::Protocol(format!(
                    "Array too large: {} elements (max {})",
                    len, MAX_ARRAY_LEN
                )));
            }

            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(read_reply_at_depth(reader, depth + 1)?);
            }
            Ok(Reply::Array(Some(items)))
        }
        _ => Err(StructsError::Protocol(format!(
            "Unknown reply type: 0x{:02x}",
            marker
        ))),
    }
}

/// Read one CRLF-terminated line, without the terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let read = reader.read_until(b'\n', &mut line)?;
    if read == 0 {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    if line.len() > MAX_LINE_LEN {
        return Err(StructsError::Protocol(format!(
            "Line too long: {} bytes (max {})",
            line.len(),
            MAX_LINE_LEN
        )));
    }
    if !line.ends_with(CRLF) {
        return Err(StructsError::Protocol(
            "Incomplete line: missing CRLF".to_string(),
        ));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_int(body: &[u8]) -> Result<i64> {
    std::str::from_utf8(body)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            StructsError::Protocol(format!(
                "Invalid integer: {:?}",
                String::from_utf8_lossy(body)
            ))
        })
}

fn push_header(out: &mut Vec<u8>, marker: u8, n: i64) {
    out.push(marker);
    out.extend_from_slice(n.to_string().as_bytes());
    out.extend_from_slice(CRLF);
}

fn push_line(out: &mut Vec<u8>, marker: u8, line: &[u8]) {
    out.push(marker);
    out.extend_from_slice(line);
    out.extend_from_slice(CRLF);
}

fn push_bulk(out: &mut Vec<u8>, bytes: &[u8]) {
    push_header(out, b'$', bytes.len() as i64);
    out.extend_from_slice(bytes);
    out.extend_from_slice(CRLF);
}
