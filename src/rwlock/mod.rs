//! BucketLock - the per-bucket reader/writer lock.
//!
//! This is a deliberate reimplementation of the two-semaphore reader lock:
//! a mutex guards the reader count, and the first reader in closes a binary
//! gate that writers must hold exclusively. The gate is rebuilt here on a
//! mutex/condvar pair rather than a semaphore, but the admission order is
//! unchanged.
//!
//! The variant is reader-preferring. While the reader group holds the gate
//! open for itself, new readers are admitted immediately even if a writer
//! is already parked on the gate, so a continuous stream of readers can
//! starve a writer indefinitely. That is a documented property of this
//! lock, not an accident.
//!
//! The guarded data lives inside the lock, and both access modes hand back
//! RAII guards, so every exit path of an operation releases - there is no
//! separate release call to forget.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::audit::{Audit, LockMode};

/// The writer-exclusion gate: a binary hold that any thread may release.
///
/// A plain mutex guard can not be released by a thread other than its
/// owner, which the reader protocol needs (first reader closes, last
/// reader opens), so the gate is a flag and a condvar.
#[derive(Debug)]
struct Gate {
    state: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    fn new() -> Self {
        Gate {
            state: Mutex::new(true),
            cond: Condvar::new(),
        }
    }

    /// Block until the gate is open, then close it for the caller.
    fn close(&self) {
        let mut open = self.state.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
        *open = false;
    }

    /// Re-open the gate and wake one parked closer.
    fn release(&self) {
        let mut open = self.state.lock();
        *open = true;
        drop(open);
        self.cond.notify_one();
    }
}

/// A reader-preferring reader/writer lock owning its data.
///
/// Unlimited concurrent readers; one writer, excluded from the whole
/// reader group and from other writers. Lock transitions are counted and
/// logged through the shared [`Audit`].
#[derive(Debug)]
pub struct BucketLock<T> {
    readers: Mutex<u32>,
    gate: Gate,
    audit: Arc<Audit>,
    data: UnsafeCell<T>,
}

// Readers hand out &T across threads, so T must be Sync as well as Send,
// same bounds as a std RwLock.
unsafe impl<T: Send> Send for BucketLock<T> {}
unsafe impl<T: Send + Sync> Sync for BucketLock<T> {}

impl<T> BucketLock<T> {
    /// Create a lock owning `data`, reporting transitions to `audit`.
    pub fn new(data: T, audit: Arc<Audit>) -> Self {
        BucketLock {
            readers: Mutex::new(0),
            gate: Gate::new(),
            audit,
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire shared read access.
    ///
    /// The first reader of a group closes the writer gate; readers after
    /// that queue on the reader-count mutex until it does. Later readers
    /// join an already-open group without consulting the gate at all.
    pub fn read(&self) -> BucketReadGuard<'_, T> {
        let mut readers = self.readers.lock();
        *readers += 1;
        if *readers == 1 {
            self.gate.close();
        }
        drop(readers);
        self.audit.lock_acquired(LockMode::Read);
        BucketReadGuard { lock: self }
    }

    /// Acquire exclusive write access.
    pub fn write(&self) -> BucketWriteGuard<'_, T> {
        self.gate.close();
        self.audit.lock_acquired(LockMode::Write);
        BucketWriteGuard { lock: self }
    }

    /// Access the data without locking.
    ///
    /// The exclusive borrow proves no guard is alive, so this needs no
    /// lock traffic. Used by the post-join reporter.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

/// Shared read access to a bucket's data. Dropping it releases.
pub struct BucketReadGuard<'a, T> {
    lock: &'a BucketLock<T>,
}

impl<T> Deref for BucketReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // The gate is closed on behalf of the reader group for as long as
        // this guard lives.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for BucketReadGuard<'_, T> {
    fn drop(&mut self) {
        let mut readers = self.lock.readers.lock();
        *readers -= 1;
        if *readers == 0 {
            self.lock.gate.release();
        }
        drop(readers);
        self.lock.audit.lock_released(LockMode::Read);
    }
}

/// Exclusive write access to a bucket's data. Dropping it releases.
pub struct BucketWriteGuard<'a, T> {
    lock: &'a BucketLock<T>,
}

impl<T> Deref for BucketWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for BucketWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Holding the gate excludes the reader group and other writers.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for BucketWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.gate.release();
        self.lock.audit.lock_released(LockMode::Write);
    }
}
