//! Shared test helpers
//!
//! - tracing output (set `RUST_LOG=kvstructs=trace` to see commands)
//! - unique collection names per test
//! - clients over an in-process store, directly or through a local RESP server

#![allow(dead_code)]

use std::io::{BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Once};
use std::thread;

use kvstructs::protocol::{read_command, write_reply, Command, Reply};
use kvstructs::{Client, Config, MemoryStore, Result, Store, StructsError};
use parking_lot::Mutex;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Collection name no other test uses
pub fn unique_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Client over a fresh in-memory store
pub fn memory_client() -> (Arc<MemoryStore>, Client) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let client = Client::with_store(Config::default(), store.clone());
    (store, client)
}

// =============================================================================
// Local RESP Server
// =============================================================================

/// Serves a `MemoryStore` over RESP on an ephemeral local port
pub struct TestServer {
    pub store: Arc<MemoryStore>,
    pub port: u16,
}

impl TestServer {
    pub fn start() -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let store = Arc::new(MemoryStore::new());

        let shared = store.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let store = shared.clone();
                thread::spawn(move || serve(stream, store));
            }
        });

        Self { store, port }
    }

    pub fn config(&self) -> Config {
        Config::builder()
            .host("127.0.0.1")
            .port(self.port)
            .read_timeout_ms(2000)
            .build()
    }

    pub fn client(&self) -> Client {
        Client::new(self.config())
    }
}

fn serve(stream: TcpStream, store: Arc<MemoryStore>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut writer = BufWriter::new(stream);
    // One session per connection, so SELECT sticks to this client only
    let mut session = store.session();

    loop {
        let command = match read_command(&mut reader) {
            Ok(command) => command,
            // Client hung up
            Err(StructsError::Io(_)) => return,
            Err(e) => {
                let _ = write_reply(&mut writer, &Reply::error(format!("ERR {}", e)));
                return;
            }
        };

        let reply = session.apply(&command);
        if write_reply(&mut writer, &reply).is_err() {
            return;
        }
    }
}

// =============================================================================
// Command Recording
// =============================================================================

/// Store wrapper remembering every command it was asked to run
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    commands: Mutex<Vec<String>>,
}

impl RecordingStore {
    /// Commands seen so far, rendered as `NAME arg arg`
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.commands.lock())
    }
}

impl Store for RecordingStore {
    fn execute(&self, command: &Command) -> Result<Reply> {
        self.commands.lock().push(command.to_string());
        self.inner.execute(command)
    }
}

/// Client over a recording store
pub fn recording_client() -> (Arc<RecordingStore>, Client) {
    init_tracing();
    let store = Arc::new(RecordingStore::default());
    let client = Client::with_store(Config::default(), store.clone());
    (store, client)
}
