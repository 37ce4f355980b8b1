//! Command definitions
//!
//! A command is the name plus its arguments, all carried as byte strings.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Result, StructsError};
use crate::keyspace::IntoValue;

/// How long the store may legitimately hold a command before replying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Ordinary request/response
    Immediate,

    /// Blocking command bounded by the given wait
    Upto(Duration),

    /// Blocking command with no bound, requested explicitly by the caller
    Forever,
}

/// A command ready to be sent to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Name followed by arguments
    parts: Vec<Bytes>,

    /// Reply wait hint used to size socket read timeouts
    wait: Wait,
}

impl Command {
    /// Start a command with the given name
    pub fn new(name: &str) -> Self {
        Self {
            parts: vec![Bytes::copy_from_slice(name.as_bytes())],
            wait: Wait::Immediate,
        }
    }

    /// Build a command from raw wire parts (name first)
    pub fn from_parts(parts: Vec<Bytes>) -> Result<Self> {
        if parts.is_empty() {
            return Err(StructsError::Protocol("empty command".to_string()));
        }
        Ok(Self {
            parts,
            wait: Wait::Immediate,
        })
    }

    /// Append one argument
    pub fn arg(mut self, value: impl IntoValue) -> Self {
        self.parts.push(value.into_value());
        self
    }

    /// Mark the command as blocking
    pub fn with_wait(mut self, wait: Wait) -> Self {
        self.wait = wait;
        self
    }

    /// Upper-cased command name
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.parts[0]).to_ascii_uppercase()
    }

    /// Arguments after the name
    pub fn args(&self) -> &[Bytes] {
        &self.parts[1..]
    }

    /// Name and arguments, as sent on the wire
    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    pub fn wait(&self) -> Wait {
        self.wait
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        for arg in self.args() {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}
