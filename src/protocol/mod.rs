//! Protocol Module
//!
//! Defines the wire protocol spoken with the store (RESP2).
//!
//! ## Request Format
//! Every command is an array of bulk strings, the first being the command name:
//! ```text
//! *3\r\n
//! $3\r\nSET\r\n
//! $9\r\nusers:ann\r\n
//! $5\r\nadmin\r\n
//! ```
//!
//! ## Reply Types
//! - `+` status line (`+OK`)
//! - `-` error line (`-ERR index out of range`)
//! - `:` integer (`:42`)
//! - `$` bulk string (`$5\r\nhello\r\n`, `$-1` = nil)
//! - `*` array of replies (`*-1` = nil array)

mod command;
mod reply;
mod codec;

pub use command::{Command, Wait};
pub use reply::Reply;
pub use codec::{
    decode_command, decode_reply, encode_command, encode_reply, read_command, read_reply,
    write_command, write_reply, MAX_ARRAY_LEN, MAX_BULK_LEN, MAX_DEPTH,
};
