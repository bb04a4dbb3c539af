//! Audit counters and the timestamped event log.
//!
//! Every lock transition and every operation appends one line to a shared
//! sink, timestamped in microseconds since the Unix epoch. The sink is
//! serialised by a mutex so concurrent appends can not interleave partial
//! lines. The lock transition counters are atomics, bumped on the same
//! call that emits the line, and read back by the final report once all
//! workers have joined.
//!
//! An `Audit` without a sink still counts transitions, which is what the
//! table uses when no log is wanted (tests, benches).

use std::fmt::Arguments;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Which mode a bucket lock transition was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Shared reader mode.
    Read,
    /// Exclusive writer mode.
    Write,
}

impl LockMode {
    fn as_str(self) -> &'static str {
        match self {
            LockMode::Read => "READ",
            LockMode::Write => "WRITE",
        }
    }
}

/// Shared audit state: lock counters plus an optional serialised log sink.
pub struct Audit {
    acquisitions: AtomicU64,
    releases: AtomicU64,
    sink: Option<Mutex<Box<dyn Write + Send>>>,
}

impl std::fmt::Debug for Audit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Audit")
            .field("acquisitions", &self.acquisitions)
            .field("releases", &self.releases)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

fn timestamp_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}

impl Audit {
    /// An audit that counts lock transitions but logs nothing.
    pub fn disabled() -> Self {
        Audit {
            acquisitions: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            sink: None,
        }
    }

    /// An audit that appends one line per event to `writer`.
    pub fn to_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Audit {
            acquisitions: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            sink: Some(Mutex::new(Box::new(writer))),
        }
    }

    /// Total lock acquisitions across all buckets so far.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Total lock releases across all buckets so far.
    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }

    // Appends are best effort, matching the reference log. A failed write
    // must never take down a worker mid-operation.
    fn emit(&self, args: Arguments) {
        if let Some(sink) = self.sink.as_ref() {
            let mut out = sink.lock();
            let _ = out.write_fmt(args);
            let _ = out.write_all(b"\n");
        }
    }

    fn emit_stamped(&self, args: Arguments) {
        if let Some(sink) = self.sink.as_ref() {
            let mut out = sink.lock();
            let _ = write!(out, "{}: ", timestamp_micros());
            let _ = out.write_fmt(args);
            let _ = out.write_all(b"\n");
        }
    }

    /// Record a lock acquisition in `mode`.
    pub fn lock_acquired(&self, mode: LockMode) {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        self.emit_stamped(format_args!("{} LOCK ACQUIRED", mode.as_str()));
    }

    /// Record a lock release in `mode`.
    pub fn lock_released(&self, mode: LockMode) {
        self.releases.fetch_add(1, Ordering::Relaxed);
        self.emit_stamped(format_args!("{} LOCK RELEASED", mode.as_str()));
    }

    /// An insert operation has begun.
    pub fn insert(&self, hash: u32, name: &str, salary: u32) {
        tracing::trace!(hash, name, salary, "insert");
        self.emit_stamped(format_args!("INSERT,{},{},{}", hash, name, salary));
    }

    /// A delete worker has started and is about to consult the barrier.
    pub fn delete_awakened(&self) {
        self.emit_stamped(format_args!("DELETE AWAKENED"));
    }

    /// A delete is parked on the barrier behind in-flight inserts.
    pub fn waiting_on_inserts(&self) {
        tracing::trace!("delete waiting on inserts");
        self.emit_stamped(format_args!("WAITING ON INSERTS"));
    }

    /// The barrier has admitted a delete for `name`.
    pub fn delete(&self, name: &str) {
        tracing::trace!(name, "delete");
        self.emit_stamped(format_args!("DELETE,{}", name));
    }

    /// A search operation has begun.
    pub fn search(&self, name: &str) {
        tracing::trace!(name, "search");
        self.emit_stamped(format_args!("SEARCH,{}", name));
    }

    /// A search found no matching record.
    pub fn search_miss(&self) {
        self.emit_stamped(format_args!("SEARCH: NOT FOUND NOT FOUND"));
    }

    /// One record row, as emitted for a search hit or a snapshot listing.
    pub fn row(&self, hash: u32, name: &str, salary: u32) {
        self.emit(format_args!("{},{},{}", hash, name, salary));
    }

    /// The post-join banner preceding the counter trailer.
    pub fn finished_all_threads(&self) {
        self.emit(format_args!("Finished all threads."));
    }

    /// The lock counter trailer of the final report.
    pub fn counter_trailer(&self) {
        self.emit(format_args!(
            "Number of lock acquisitions: {}",
            self.acquisitions()
        ));
        self.emit(format_args!("Number of lock releases: {}", self.releases()));
    }

    /// The empty-table report line.
    pub fn table_empty(&self) {
        self.emit(format_args!("Table is empty."));
    }
}
