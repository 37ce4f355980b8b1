//! In-process store
//!
//! A `Store` that keeps data in memory and answers the command subset the
//! collection adapters issue, with the same reply shapes and error messages a
//! remote store sends.
//!
//! ## Concurrency Model
//! - All state sits behind one `parking_lot::Mutex`, so every command is
//!   atomic, like on a single-threaded server
//! - `BRPOP` waits on a `Condvar` that pushes signal
//!
//! ## Scan Cursors
//! Keys and set members are kept in sorted order. A cursor names the last
//! entry a scan returned; the next batch resumes strictly after it. Entries
//! present for the whole scan are therefore never skipped, while entries
//! added or removed mid-scan may or may not appear.
//!
//! ## Databases
//! Keys live in one of [`DATABASES`] numbered databases. [`MemoryStore::apply`]
//! and the [`Store`] impl always use database 0; a [`Session`] tracks its own
//! `SELECT`, the way each connection to a server does.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::ops::Bound;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use crate::error::Result;
use crate::keyspace::pattern_matches;
use crate::protocol::{Command, Reply};
use crate::store::Store;

/// Outcome of a command: `Err` carries the error reply to send back
type Outcome = std::result::Result<Reply, Reply>;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_INTEGER: &str = "ERR value is not an integer or out of range";
const SYNTAX: &str = "ERR syntax error";

/// Default scan batch size when no COUNT is given
const DEFAULT_SCAN_COUNT: usize = 10;

/// Live scan cursors kept before the oldest are forgotten
const MAX_OPEN_CURSORS: usize = 4096;

/// Number of databases `SELECT` can address
pub const DATABASES: usize = 16;

/// Value held at one key
#[derive(Debug, Clone)]
enum Entry {
    Str(Bytes),
    List(VecDeque<Bytes>),
    Set(BTreeSet<Bytes>),
}

/// Resume points of unfinished scans
#[derive(Debug, Default)]
struct Cursors {
    next_id: u64,
    resume_after: HashMap<u64, Bytes>,
    order: VecDeque<u64>,
}

impl Cursors {
    fn open(&mut self, last: Bytes) -> u64 {
        if self.order.len() >= MAX_OPEN_CURSORS {
            if let Some(oldest) = self.order.pop_front() {
                self.resume_after.remove(&oldest);
            }
        }

        self.next_id += 1;
        let id = self.next_id;
        self.resume_after.insert(id, last);
        self.order.push_back(id);
        id
    }

    fn resume(&self, id: u64) -> std::result::Result<Bound<Bytes>, Reply> {
        if id == 0 {
            return Ok(Bound::Unbounded);
        }
        self.resume_after
            .get(&id)
            .map(|last| Bound::Excluded(last.clone()))
            .ok_or_else(|| Reply::error("ERR invalid cursor"))
    }
}

#[derive(Debug)]
struct State {
    databases: Vec<Database>,
    cursors: Cursors,
}

impl Default for State {
    fn default() -> Self {
        Self {
            databases: (0..DATABASES).map(|_| Database::default()).collect(),
            cursors: Cursors::default(),
        }
    }
}

/// One numbered keyspace
#[derive(Debug, Default)]
struct Database {
    entries: BTreeMap<Bytes, Entry>,
}

/// In-memory store with store-compatible command semantics
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,

    /// Signalled whenever a list receives new elements
    pushed: Condvar,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held, across all databases
    pub fn key_count(&self) -> usize {
        self.state
            .lock()
            .databases
            .iter()
            .map(|db| db.entries.len())
            .sum()
    }

    /// Number of keys held in one database
    pub fn key_count_in(&self, database: usize) -> usize {
        self.state
            .lock()
            .databases
            .get(database)
            .map_or(0, |db| db.entries.len())
    }

    /// Drop every key in every database
    pub fn flush(&self) {
        *self.state.lock() = State::default();
    }

    /// Execute a command against database 0 and return the raw reply, error
    /// replies included
    ///
    /// `SELECT` is validated but has no lasting effect here; use a
    /// [`Session`] to switch databases.
    pub fn apply(&self, command: &Command) -> Reply {
        self.apply_in(0, command)
    }

    /// Per-connection view starting on database 0
    pub fn session(&self) -> Session<'_> {
        Session {
            store: self,
            database: 0,
        }
    }

    fn apply_in(&self, database: usize, command: &Command) -> Reply {
        let name = command.name();
        let args = command.args();

        let outcome = match name.as_str() {
            "SELECT" => select_index(args).map(|_| Reply::ok()),
            "BRPOP" => self.blocking_pop(database, args),
            _ => {
                let mut state = self.state.lock();
                let State { databases, cursors } = &mut *state;
                let outcome = databases[database].apply(cursors, &name, args);
                if name == "LPUSH" || name == "RPUSH" {
                    self.pushed.notify_all();
                }
                outcome
            }
        };

        outcome.unwrap_or_else(|error| error)
    }

    // =========================================================================
    // Blocking Pop
    // =========================================================================

    fn blocking_pop(&self, database: usize, args: &[Bytes]) -> Outcome {
        let (timeout, keys) = match args.split_last() {
            Some((timeout, keys)) if !keys.is_empty() => (parse_timeout(timeout)?, keys),
            _ => return Err(arity("brpop")),
        };
        // A deadline past what `Instant` can hold is no deadline
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        let mut state = self.state.lock();
        loop {
            for key in keys {
                if let Some(value) = state.databases[database].pop_back(key)? {
                    return Ok(Reply::bulk_array([key.clone(), value]));
                }
            }

            match deadline {
                None => self.pushed.wait(&mut state),
                Some(deadline) => {
                    if self.pushed.wait_until(&mut state, deadline).timed_out() {
                        // One last look: a push may have landed with the timeout
                        for key in keys {
                            if let Some(value) = state.databases[database].pop_back(key)? {
                                return Ok(Reply::bulk_array([key.clone(), value]));
                            }
                        }
                        return Ok(Reply::Array(None));
                    }
                }
            }
        }
    }
}

impl Store for MemoryStore {
    fn execute(&self, command: &Command) -> Result<Reply> {
        tracing::trace!("Applying in memory: {}", command);
        self.apply(command).into_result()
    }
}

/// Connection-scoped access to a [`MemoryStore`]
///
/// Remembers the database chosen by the last successful `SELECT`, so a
/// server front-end keeps one session per client connection.
#[derive(Debug)]
pub struct Session<'a> {
    store: &'a MemoryStore,
    database: usize,
}

impl Session<'_> {
    /// Currently selected database
    pub fn database(&self) -> usize {
        self.database
    }

    /// Execute a command against the selected database
    pub fn apply(&mut self, command: &Command) -> Reply {
        if command.name() == "SELECT" {
            if let Ok(database) = select_index(command.args()) {
                self.database = database;
            }
        }
        self.store.apply_in(self.database, command)
    }
}

// =============================================================================
// Command Dispatch
// =============================================================================

impl Database {
    fn apply(&mut self, cursors: &mut Cursors, name: &str, args: &[Bytes]) -> Outcome {
        match name {
            // Connection
            "PING" => match args {
                [] => Ok(Reply::Status("PONG".to_string())),
                [message] => Ok(Reply::bulk(message.clone())),
                _ => Err(arity("ping")),
            },

            // Keys and strings
            "GET" => {
                let [key] = exact::<1>(args, "get")?;
                match self.entries.get(key) {
                    None => Ok(Reply::nil()),
                    Some(Entry::Str(value)) => Ok(Reply::bulk(value.clone())),
                    Some(_) => Err(Reply::error(WRONGTYPE)),
                }
            }
            "SET" => {
                let [key, value] = exact::<2>(args, "set")?;
                self.entries.insert(key.clone(), Entry::Str(value.clone()));
                Ok(Reply::ok())
            }
            "DEL" => {
                at_least(args, 1, "del")?;
                let removed = args
                    .iter()
                    .filter(|key| self.entries.remove(*key).is_some())
                    .count();
                Ok(Reply::Integer(removed as i64))
            }
            "EXISTS" => {
                at_least(args, 1, "exists")?;
                let present = args
                    .iter()
                    .filter(|key| self.entries.contains_key(*key))
                    .count();
                Ok(Reply::Integer(present as i64))
            }
            "INCR" => {
                let [key] = exact::<1>(args, "incr")?;
                self.add_to(key, 1)
            }
            "DECR" => {
                let [key] = exact::<1>(args, "decr")?;
                self.add_to(key, -1)
            }
            "SCAN" => {
                at_least(args, 1, "scan")?;
                let start = cursors.resume(parse_cursor(&args[0])?)?;
                let options = ScanOptions::parse(&args[1..])?;
                let candidates = self.entries.range((start, Bound::Unbounded)).map(|(k, _)| k);
                let (last, batch) = options.collect(candidates);
                Ok(scan_reply(cursors, last, batch))
            }

            // Sets
            "SADD" => {
                at_least(args, 2, "sadd")?;
                let set = self.set_or_create(&args[0])?;
                let added = args[1..].iter().filter(|m| set.insert((*m).clone())).count();
                Ok(Reply::Integer(added as i64))
            }
            "SREM" => {
                at_least(args, 2, "srem")?;
                let removed = match self.set_mut(&args[0])? {
                    Some(set) => args[1..].iter().filter(|m| set.remove(*m)).count(),
                    None => 0,
                };
                self.drop_if_empty(&args[0]);
                Ok(Reply::Integer(removed as i64))
            }
            "SISMEMBER" => {
                let [key, member] = exact::<2>(args, "sismember")?;
                let present = self.set(key)?.map_or(false, |set| set.contains(member));
                Ok(Reply::Integer(present as i64))
            }
            "SCARD" => {
                let [key] = exact::<1>(args, "scard")?;
                let count = self.set(key)?.map_or(0, |set| set.len());
                Ok(Reply::Integer(count as i64))
            }
            "SMEMBERS" => {
                let [key] = exact::<1>(args, "smembers")?;
                let members = self.set(key)?.cloned().unwrap_or_default();
                Ok(Reply::bulk_array(members))
            }
            "SSCAN" => {
                at_least(args, 2, "sscan")?;
                let start = cursors.resume(parse_cursor(&args[1])?)?;
                let options = ScanOptions::parse(&args[2..])?;
                let (last, batch) = match self.set(&args[0])? {
                    Some(set) => options.collect(set.range((start, Bound::Unbounded))),
                    None => (None, Vec::new()),
                };
                Ok(scan_reply(cursors, last, batch))
            }
            "SUNION" => {
                at_least(args, 1, "sunion")?;
                let mut union = BTreeSet::new();
                for key in args {
                    if let Some(set) = self.set(key)? {
                        union.extend(set.iter().cloned());
                    }
                }
                Ok(Reply::bulk_array(union))
            }
            "SDIFF" => {
                at_least(args, 1, "sdiff")?;
                let mut diff = self.set(&args[0])?.cloned().unwrap_or_default();
                for key in &args[1..] {
                    if let Some(set) = self.set(key)? {
                        diff.retain(|m| !set.contains(m));
                    }
                }
                Ok(Reply::bulk_array(diff))
            }

            // Lists
            "LPUSH" | "RPUSH" => {
                at_least(args, 2, &name.to_ascii_lowercase())?;
                let list = self.list_or_create(&args[0])?;
                for value in &args[1..] {
                    if name == "LPUSH" {
                        list.push_front(value.clone());
                    } else {
                        list.push_back(value.clone());
                    }
                }
                Ok(Reply::Integer(list.len() as i64))
            }
            "RPOP" => {
                let [key] = exact::<1>(args, "rpop")?;
                Ok(Reply::Bulk(self.pop_back(key)?))
            }
            "LLEN" => {
                let [key] = exact::<1>(args, "llen")?;
                let len = self.list(key)?.map_or(0, |list| list.len());
                Ok(Reply::Integer(len as i64))
            }
            "LINDEX" => {
                let [key, index] = exact::<2>(args, "lindex")?;
                let index = parse_int(index)?;
                let value = self
                    .list(key)?
                    .and_then(|list| resolve_index(index, list.len()).map(|i| list[i].clone()));
                Ok(Reply::Bulk(value))
            }
            "LSET" => {
                let [key, index, value] = exact::<3>(args, "lset")?;
                let index = parse_int(index)?;
                let list = self
                    .list_mut(key)?
                    .ok_or_else(|| Reply::error("ERR no such key"))?;
                let slot = resolve_index(index, list.len())
                    .ok_or_else(|| Reply::error("ERR index out of range"))?;
                list[slot] = value.clone();
                Ok(Reply::ok())
            }
            "LREM" => {
                let [key, count, value] = exact::<3>(args, "lrem")?;
                let count = parse_int(count)?;
                let removed = match self.list_mut(key)? {
                    Some(list) => remove_occurrences(list, count, value),
                    None => 0,
                };
                self.drop_if_empty(key);
                Ok(Reply::Integer(removed as i64))
            }
            "LPOS" => {
                let [key, value] = exact::<2>(args, "lpos")?;
                let position = self
                    .list(key)?
                    .and_then(|list| list.iter().position(|item| item == value));
                Ok(position.map_or(Reply::nil(), |p| Reply::Integer(p as i64)))
            }

            other => Err(Reply::error(format!(
                "ERR unknown command '{}'",
                other.to_ascii_lowercase()
            ))),
        }
    }

    // =========================================================================
    // Typed Access
    // =========================================================================

    fn set(&self, key: &Bytes) -> std::result::Result<Option<&BTreeSet<Bytes>>, Reply> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Set(set)) => Ok(Some(set)),
            Some(_) => Err(Reply::error(WRONGTYPE)),
        }
    }

    fn set_mut(&mut self, key: &Bytes) -> std::result::Result<Option<&mut BTreeSet<Bytes>>, Reply> {
        match self.entries.get_mut(key) {
            None => Ok(None),
            Some(Entry::Set(set)) => Ok(Some(set)),
            Some(_) => Err(Reply::error(WRONGTYPE)),
        }
    }

    fn set_or_create(&mut self, key: &Bytes) -> std::result::Result<&mut BTreeSet<Bytes>, Reply> {
        match self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::Set(BTreeSet::new()))
        {
            Entry::Set(set) => Ok(set),
            _ => Err(Reply::error(WRONGTYPE)),
        }
    }

    fn list(&self, key: &Bytes) -> std::result::Result<Option<&VecDeque<Bytes>>, Reply> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::List(list)) => Ok(Some(list)),
            Some(_) => Err(Reply::error(WRONGTYPE)),
        }
    }

    fn list_mut(
        &mut self,
        key: &Bytes,
    ) -> std::result::Result<Option<&mut VecDeque<Bytes>>, Reply> {
        match self.entries.get_mut(key) {
            None => Ok(None),
            Some(Entry::List(list)) => Ok(Some(list)),
            Some(_) => Err(Reply::error(WRONGTYPE)),
        }
    }

    fn list_or_create(
        &mut self,
        key: &Bytes,
    ) -> std::result::Result<&mut VecDeque<Bytes>, Reply> {
        match self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::List(VecDeque::new()))
        {
            Entry::List(list) => Ok(list),
            _ => Err(Reply::error(WRONGTYPE)),
        }
    }

    fn pop_back(&mut self, key: &Bytes) -> std::result::Result<Option<Bytes>, Reply> {
        let value = self.list_mut(key)?.and_then(|list| list.pop_back());
        self.drop_if_empty(key);
        Ok(value)
    }

    /// Empty lists and sets stop existing
    fn drop_if_empty(&mut self, key: &Bytes) {
        let empty = match self.entries.get(key) {
            Some(Entry::List(list)) => list.is_empty(),
            Some(Entry::Set(set)) => set.is_empty(),
            _ => false,
        };
        if empty {
            self.entries.remove(key);
        }
    }

    fn add_to(&mut self, key: &Bytes, delta: i64) -> Outcome {
        let current = match self.entries.get(key) {
            None => 0,
            Some(Entry::Str(raw)) => parse_int(raw)?,
            Some(_) => return Err(Reply::error(WRONGTYPE)),
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| Reply::error("ERR increment or decrement would overflow"))?;
        self.entries
            .insert(key.clone(), Entry::Str(Bytes::from(next.to_string())));
        Ok(Reply::Integer(next))
    }
}

fn scan_reply(cursors: &mut Cursors, last: Option<Bytes>, batch: Vec<Bytes>) -> Reply {
    let cursor = match last {
        Some(last) => cursors.open(last),
        None => 0,
    };
    Reply::Array(Some(vec![
        Reply::bulk(Bytes::from(cursor.to_string())),
        Reply::bulk_array(batch),
    ]))
}

// =============================================================================
// Scan Options
// =============================================================================

struct ScanOptions {
    pattern: Option<Bytes>,
    count: usize,
}

impl ScanOptions {
    fn parse(args: &[Bytes]) -> std::result::Result<Self, Reply> {
        let mut options = ScanOptions {
            pattern: None,
            count: DEFAULT_SCAN_COUNT,
        };

        let mut rest = args.iter();
        while let Some(option) = rest.next() {
            let value = rest.next().ok_or_else(|| Reply::error(SYNTAX))?;
            if option.eq_ignore_ascii_case(b"MATCH") {
                options.pattern = Some(value.clone());
            } else if option.eq_ignore_ascii_case(b"COUNT") {
                let count = parse_int(value)?;
                if count < 1 {
                    return Err(Reply::error(SYNTAX));
                }
                options.count = count as usize;
            } else {
                return Err(Reply::error(SYNTAX));
            }
        }

        Ok(options)
    }

    /// Examine up to `count` candidates and keep the matching ones
    ///
    /// Returns the resume point (`None` once the candidates are exhausted)
    /// and the matches. A batch may be empty while the scan is unfinished.
    fn collect<'a, I>(&self, candidates: I) -> (Option<Bytes>, Vec<Bytes>)
    where
        I: Iterator<Item = &'a Bytes>,
    {
        let mut candidates = candidates.peekable();
        let mut batch = Vec::new();
        let mut last = None;

        for candidate in candidates.by_ref().take(self.count) {
            let keep = self
                .pattern
                .as_ref()
                .map_or(true, |p| pattern_matches(p, candidate));
            if keep {
                batch.push(candidate.clone());
            }
            last = Some(candidate.clone());
        }

        if candidates.peek().is_none() {
            last = None;
        }
        (last, batch)
    }
}

// =============================================================================
// Argument Helpers
// =============================================================================

fn arity(command: &str) -> Reply {
    Reply::error(format!(
        "ERR wrong number of arguments for '{}' command",
        command
    ))
}

fn exact<'a, const N: usize>(
    args: &'a [Bytes],
    command: &str,
) -> std::result::Result<&'a [Bytes; N], Reply> {
    args.try_into().map_err(|_| arity(command))
}

fn at_least(args: &[Bytes], n: usize, command: &str) -> std::result::Result<(), Reply> {
    if args.len() < n {
        return Err(arity(command));
    }
    Ok(())
}

fn parse_int(raw: &[u8]) -> std::result::Result<i64, Reply> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Reply::error(NOT_INTEGER))
}

fn parse_cursor(raw: &[u8]) -> std::result::Result<u64, Reply> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Reply::error("ERR invalid cursor"))
}

/// Seconds (fractional allowed); zero means wait forever
fn parse_timeout(raw: &[u8]) -> std::result::Result<Option<Duration>, Reply> {
    let secs: f64 = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|s: &f64| s.is_finite())
        .ok_or_else(|| Reply::error("ERR timeout is not a float or out of range"))?;

    if secs < 0.0 {
        return Err(Reply::error("ERR timeout is negative"));
    }
    if secs == 0.0 {
        return Ok(None);
    }
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|_| Reply::error("ERR timeout is out of range"))
}

/// Database index named by a `SELECT`
fn select_index(args: &[Bytes]) -> std::result::Result<usize, Reply> {
    let [db] = exact::<1>(args, "select")?;
    usize::try_from(parse_int(db)?)
        .ok()
        .filter(|&db| db < DATABASES)
        .ok_or_else(|| Reply::error("ERR DB index is out of range"))
}

/// Map a possibly negative list index onto `0..len`
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    (0..len).contains(&resolved).then(|| resolved as usize)
}

/// `LREM` semantics: `count > 0` from the head, `< 0` from the tail, `0` all
fn remove_occurrences(list: &mut VecDeque<Bytes>, count: i64, value: &Bytes) -> usize {
    let limit = if count == 0 {
        usize::MAX
    } else {
        count.unsigned_abs() as usize
    };

    let mut removed = 0;
    if count >= 0 {
        let mut i = 0;
        while i < list.len() && removed < limit {
            if &list[i] == value {
                list.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
    } else {
        let mut i = list.len();
        while i > 0 && removed < limit {
            i -= 1;
            if &list[i] == value {
                list.remove(i);
                removed += 1;
            }
        }
    }
    removed
}
