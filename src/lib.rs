//! Bucketmap - a concurrent bucketed hash table
//!
//! A fixed-size hash table of independently locked buckets, supporting
//! concurrent insert, search and delete from any number of threads. The
//! synchronization is built from first principles: each bucket is guarded
//! by a hand-rolled reader-preferring reader/writer lock, and a global
//! condition-variable barrier orders every delete after all in-flight
//! inserts, table-wide.
//!
//! Per-bucket mutation is linearizable: writes within a bucket are totally
//! ordered and mutually exclusive with reads, while operations on
//! different buckets run fully in parallel. The reader/writer lock admits
//! an unlimited reader group and is deliberately reader-preferring - a
//! steady stream of readers can starve a waiting writer. See
//! [`rwlock::BucketLock`] for the details of that property.
//!
//! Every lock transition and operation can be appended to a timestamped
//! audit log, with transition counters reported once all workers are
//! done.
//!
//! # Examples
//! ```
//! use bucketmap::Table;
//!
//! let table = Table::new();
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| {
//!         table.insert("Alice", 100);
//!     });
//!     s.spawn(|| {
//!         table.insert("Bob", 200);
//!     });
//! });
//!
//! assert_eq!(table.search("Alice").map(|r| r.salary), Some(100));
//! assert!(table.delete("Bob"));
//! assert_eq!(table.len(), 1);
//! ```

#![deny(warnings)]
#![warn(unused_extern_crates)]
#![warn(missing_docs)]

pub mod audit;
pub mod barrier;
pub mod dispatch;
pub mod hash;
pub mod rwlock;
pub mod table;

pub use audit::{Audit, LockMode};
pub use barrier::InsertDeleteBarrier;
pub use dispatch::{run_file, Command, DispatchError};
pub use table::{InsertOutcome, Record, Table, BUCKET_COUNT, MAX_NAME_LEN};
