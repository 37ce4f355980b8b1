//! Store Connection
//!
//! One blocking TCP connection to the store.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, StructsError};
use crate::protocol::{read_reply, write_command, Command, Reply, Wait};

/// A single connection to the store
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Read timeout for ordinary commands
    read_timeout: Option<Duration>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Dial the store and select the configured database
    pub fn open(config: &Config) -> Result<Self> {
        let addr = config.addr();
        let stream = dial(&addr, config.connect_timeout())?;

        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| addr.clone());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        stream.set_read_timeout(config.read_timeout())?;
        stream.set_write_timeout(config.write_timeout())?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        let mut connection = Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            read_timeout: config.read_timeout(),
            peer_addr,
        };

        if config.database != 0 {
            connection
                .execute(&Command::new("SELECT").arg(config.database))?
                .into_status("SELECT")?;
        }

        tracing::debug!(
            "Connection established to {} (db {})",
            connection.peer_addr,
            config.database
        );
        Ok(connection)
    }

    /// Send one command and read its reply
    ///
    /// Error replies come back as `Err`. Blocking commands widen the read
    /// timeout for this call only.
    pub fn execute(&mut self, command: &Command) -> Result<Reply> {
        tracing::trace!("Sending to {}: {}", self.peer_addr, command);

        let wait = command.wait();
        if wait != Wait::Immediate {
            self.set_read_timeout(blocking_timeout(self.read_timeout, wait))?;
        }

        write_command(&mut self.writer, command)?;
        let reply = read_reply(&mut self.reader);

        if wait != Wait::Immediate {
            self.set_read_timeout(self.read_timeout)?;
        }

        let reply = reply.map_err(|e| match e {
            StructsError::Io(ref io)
                if matches!(
                    io.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                StructsError::Connection(format!("timed out waiting for {}", self.peer_addr))
            }
            other => other,
        })?;

        reply.into_result()
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Socket timeout covering a blocking command's own wait
///
/// A total too large to represent means no socket timeout at all.
fn blocking_timeout(base: Option<Duration>, wait: Wait) -> Option<Duration> {
    match wait {
        Wait::Immediate => base,
        Wait::Upto(limit) => base
            .unwrap_or_default()
            .checked_add(limit)
            .filter(|t| !t.is_zero()),
        Wait::Forever => None,
    }
}

fn dial(addr: &str, timeout: Option<Duration>) -> Result<TcpStream> {
    let unreachable_err =
        |e: std::io::Error| StructsError::Connection(format!("cannot reach {}: {}", addr, e));

    let Some(timeout) = timeout else {
        return TcpStream::connect(addr).map_err(unreachable_err);
    };

    let mut last_err = None;
    for socket_addr in addr.to_socket_addrs().map_err(unreachable_err)? {
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }

    Err(match last_err {
        Some(e) => unreachable_err(e),
        None => StructsError::Connection(format!("no address resolved for {}", addr)),
    })
}
