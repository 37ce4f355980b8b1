//! Configuration for kvstructs
//!
//! Store connection parameters with sensible defaults. A `Config` is handed to
//! [`Client::new`](crate::Client::new) once; the client keeps its own copy, so
//! later edits never reach an already-open connection.

use std::time::Duration;

use crate::error::{Result, StructsError};

/// Main configuration for a kvstructs client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Address
    // -------------------------------------------------------------------------
    /// Store host name or IP
    pub host: String,

    /// Store TCP port
    pub port: u16,

    /// Logical database index selected on every new connection
    pub database: u32,

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------
    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Reply read timeout (milliseconds); blocking pops add their own wait
    pub read_timeout_ms: u64,

    /// Request write timeout (milliseconds)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Pool / Iteration Tuning
    // -------------------------------------------------------------------------
    /// Idle connections kept for reuse
    pub max_idle_connections: usize,

    /// COUNT hint passed to incremental scans
    pub scan_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            database: 0,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            max_idle_connections: 8,
            scan_count: 10,
        }
    }
}

impl Config {
    const URL_SCHEME: &'static str = "redis://";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` string used for dialling
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }

    /// Parse `redis://host[:port][/db]`, keeping defaults for omitted parts
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(Self::URL_SCHEME)
            .ok_or_else(|| StructsError::Config(format!("unsupported url scheme: {}", url)))?;

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, Some(path)),
            None => (rest, None),
        };

        let mut config = Config::default();

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        };
        if !host.is_empty() {
            config.host = host.to_string();
        }
        if let Some(port) = port {
            config.port = port
                .parse()
                .map_err(|_| StructsError::Config(format!("invalid port: {}", port)))?;
        }

        if let Some(path) = path.filter(|p| !p.is_empty()) {
            config.database = path
                .parse()
                .map_err(|_| StructsError::Config(format!("invalid database index: {}", path)))?;
        }

        Ok(config)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    // Zero disables the timeout
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the store port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the database index
    pub fn database(mut self, database: u32) -> Self {
        self.config.database = database;
        self
    }

    /// Set the connect timeout (in milliseconds, 0 = none)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds, 0 = none)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds, 0 = none)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set how many idle connections the pool keeps
    pub fn max_idle_connections(mut self, count: usize) -> Self {
        self.config.max_idle_connections = count;
        self
    }

    /// Set the scan COUNT hint
    pub fn scan_count(mut self, count: usize) -> Self {
        self.config.scan_count = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
