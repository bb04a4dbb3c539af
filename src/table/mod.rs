//! The fixed-size bucketed table and its operations.
//!
//! A `Table` is a fixed array of buckets, each an owned list of records
//! paired with its own [`BucketLock`]. Buckets are fully independent: a
//! record's digest is fixed at creation, so a record never moves between
//! buckets, and operations on different buckets run in parallel. Within a
//! bucket, writes are serialised by the lock, and all writes in the table
//! are ordered against deletes by the global [`InsertDeleteBarrier`].
//!
//! Within one bucket, at most one record carries a given name: insert
//! updates a matching record in place rather than duplicating it.

use std::sync::Arc;

use crate::audit::Audit;
use crate::barrier::InsertDeleteBarrier;
use crate::hash;
use crate::rwlock::BucketLock;

/// Number of buckets in a table.
pub const BUCKET_COUNT: usize = 100;

/// Maximum accepted name length, in bytes.
pub const MAX_NAME_LEN: usize = 50;

/// One named salary record. Carries the full 32-bit digest of its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Full digest of `name`.
    pub hash: u32,
    /// The record key, at most [`MAX_NAME_LEN`] bytes.
    pub name: String,
    /// The record value.
    pub salary: u32,
}

/// What an insert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was created.
    Inserted,
    /// An existing record's salary was overwritten in place.
    Updated,
}

/// A concurrent bucketed hash table.
///
/// The constructor establishes the bucket array and the barrier; dropping
/// the table tears both down. All operations take `&self` and may be
/// called from any number of threads.
#[derive(Debug)]
pub struct Table {
    buckets: Vec<BucketLock<Vec<Record>>>,
    barrier: InsertDeleteBarrier,
    audit: Arc<Audit>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// A table of [`BUCKET_COUNT`] buckets with counting-only audit.
    pub fn new() -> Self {
        Self::with_audit(Arc::new(Audit::disabled()))
    }

    /// A table of [`BUCKET_COUNT`] buckets reporting to `audit`.
    pub fn with_audit(audit: Arc<Audit>) -> Self {
        let buckets = (0..BUCKET_COUNT)
            .map(|_| BucketLock::new(Vec::new(), audit.clone()))
            .collect();
        Table {
            buckets,
            barrier: InsertDeleteBarrier::new(),
            audit,
        }
    }

    /// The audit shared by this table and its locks.
    pub fn audit(&self) -> &Arc<Audit> {
        &self.audit
    }

    /// The table's insert/delete ordering barrier.
    pub fn barrier(&self) -> &InsertDeleteBarrier {
        &self.barrier
    }

    fn bucket(&self, digest: u32) -> &BucketLock<Vec<Record>> {
        &self.buckets[digest as usize % self.buckets.len()]
    }

    /// Insert `name` with `salary`, or overwrite the salary of an
    /// existing record in place.
    ///
    /// Registers with the barrier for the duration of the mutation, so no
    /// delete anywhere in the table splices concurrently with it.
    pub fn insert(&self, name: &str, salary: u32) -> InsertOutcome {
        let digest = hash::one_at_a_time(name);
        self.audit.insert(digest, name, salary);

        let _ticket = self.barrier.begin_insert();
        let mut records = self.bucket(digest).write();
        if let Some(existing) = records.iter_mut().find(|r| r.name == name) {
            // Update in place, list position unchanged.
            existing.salary = salary;
            return InsertOutcome::Updated;
        }
        // New records go to the front, as a list prepend.
        records.insert(
            0,
            Record {
                hash: digest,
                name: name.to_string(),
                salary,
            },
        );
        InsertOutcome::Inserted
    }

    /// Look up `name`, returning a copy of its record if present.
    pub fn search(&self, name: &str) -> Option<Record> {
        self.audit.search(name);

        let digest = hash::one_at_a_time(name);
        let records = self.bucket(digest).read();
        match records.iter().find(|r| r.name == name) {
            Some(found) => {
                self.audit.row(found.hash, &found.name, found.salary);
                Some(found.clone())
            }
            None => {
                self.audit.search_miss();
                None
            }
        }
    }

    /// Remove the record named `name`, returning whether one was found.
    ///
    /// Waits on the barrier until no insert is in flight anywhere in the
    /// table, then splices under the bucket write lock. The barrier is
    /// signalled on completion whether or not a record was found.
    pub fn delete(&self, name: &str) -> bool {
        self.audit.delete_awakened();
        self.barrier.begin_delete(|| self.audit.waiting_on_inserts());
        self.audit.delete(name);

        let digest = hash::one_at_a_time(name);
        let removed = {
            let mut records = self.bucket(digest).write();
            match records.iter().position(|r| r.name == name) {
                Some(idx) => {
                    records.remove(idx);
                    true
                }
                None => false,
            }
        };
        self.barrier.end_delete();
        removed
    }

    /// Copy out every record, sorted by digest ascending.
    ///
    /// Read-locks each bucket in index order, releasing each lock as soon
    /// as its bucket is copied; the scan never holds two locks at once.
    /// Ties on the digest break arbitrarily.
    pub fn snapshot(&self) -> Vec<Record> {
        let mut rows = Vec::new();
        for bucket in self.buckets.iter() {
            let records = bucket.read();
            rows.extend(records.iter().cloned());
        }
        rows.sort_unstable_by_key(|r| r.hash);
        rows
    }

    /// Number of records currently in the table.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.read().len()).sum()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Emit the final report to the audit log.
    ///
    /// Meant to run after every worker has joined; the exclusive borrow
    /// encodes that, and lets the rows be gathered without lock traffic so
    /// the printed counters reflect only the workers' activity. One
    /// defensive read-lock pair still brackets the listing itself.
    pub fn report(&mut self) {
        let mut rows: Vec<Record> = Vec::new();
        for bucket in self.buckets.iter_mut() {
            rows.extend(bucket.get_mut().iter().cloned());
        }
        rows.sort_unstable_by_key(|r| r.hash);

        if rows.is_empty() {
            self.audit.counter_trailer();
            self.audit.table_empty();
            return;
        }

        self.audit.finished_all_threads();
        self.audit.counter_trailer();

        let _guard = self.buckets[0].read();
        for r in rows.iter() {
            self.audit.row(r.hash, &r.name, r.salary);
        }
    }
}
