//! InsertDeleteBarrier - the global insert/delete ordering coordinator.
//!
//! The per-bucket locks already serialise mutation within a bucket. This
//! barrier adds a stronger, table-wide rule: no delete may splice a record
//! out while any insert is in flight anywhere, even in an unrelated
//! bucket. Inserts never wait for deletes; the ordering is one-way.
//!
//! The protocol is one mutex over two counters plus two condvars. An
//! insert registers itself on entry and deregisters on exit, broadcasting
//! to all parked deletes when the in-flight count hits zero. A delete
//! loops on the in-flight count before it may touch its bucket, so a
//! spurious wakeup or an insert that slipped in before the delete retook
//! the mutex just parks it again.

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct BarrierState {
    inserts_in_progress: u32,
    deletes_waiting: u32,
}

/// Coordinates the two operation classes across all buckets.
///
/// Invariant: while `inserts_in_progress > 0`, no delete is inside its
/// bucket-mutating section.
#[derive(Debug)]
pub struct InsertDeleteBarrier {
    state: Mutex<BarrierState>,
    inserts_done: Condvar,
    delete_done: Condvar,
}

impl Default for InsertDeleteBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl InsertDeleteBarrier {
    /// Create a barrier with no operations in flight.
    pub fn new() -> Self {
        InsertDeleteBarrier {
            state: Mutex::new(BarrierState {
                inserts_in_progress: 0,
                deletes_waiting: 0,
            }),
            inserts_done: Condvar::new(),
            delete_done: Condvar::new(),
        }
    }

    /// Register an insert as in flight. The returned ticket deregisters it
    /// on drop, so the insert body can not leak an in-flight count on any
    /// exit path.
    pub fn begin_insert(&self) -> InsertTicket<'_> {
        let mut state = self.state.lock();
        state.inserts_in_progress += 1;
        InsertTicket { barrier: self }
    }

    /// Block until no insert is in flight, then admit the delete.
    ///
    /// `on_wait` runs each time the delete parks, so the caller can log
    /// the wait. The loop re-checks after every wakeup.
    pub fn begin_delete<F: FnMut()>(&self, mut on_wait: F) {
        let mut state = self.state.lock();
        while state.inserts_in_progress > 0 {
            state.deletes_waiting += 1;
            on_wait();
            self.inserts_done.wait(&mut state);
            state.deletes_waiting -= 1;
        }
        // Still under the mutex: admission only happens with nothing in
        // flight. Inserts arriving after we release are not ordered
        // against this delete.
        debug_assert_eq!(state.inserts_in_progress, 0);
    }

    /// Signal that a delete has retired, whether or not it found a record.
    pub fn end_delete(&self) {
        let _state = self.state.lock();
        self.delete_done.notify_one();
    }

    /// Block until some delete retires. Not needed for the barrier's own
    /// correctness; offered for external synchronisation.
    pub fn wait_delete_retired(&self) {
        let mut state = self.state.lock();
        self.delete_done.wait(&mut state);
    }

    /// Number of inserts currently in flight.
    pub fn inserts_in_progress(&self) -> u32 {
        self.state.lock().inserts_in_progress
    }

    /// Number of deletes currently parked on the barrier.
    pub fn deletes_waiting(&self) -> u32 {
        self.state.lock().deletes_waiting
    }

    fn end_insert(&self) {
        let mut state = self.state.lock();
        state.inserts_in_progress -= 1;
        if state.inserts_in_progress == 0 && state.deletes_waiting > 0 {
            // Broadcast: several deletes may be parked, and a single
            // signal would strand the rest until the next insert cycle.
            self.inserts_done.notify_all();
        }
    }
}

/// An in-flight insert registration. Dropping it deregisters the insert
/// and wakes parked deletes if it was the last one.
#[derive(Debug)]
pub struct InsertTicket<'a> {
    barrier: &'a InsertDeleteBarrier,
}

impl Drop for InsertTicket<'_> {
    fn drop(&mut self) {
        self.barrier.end_insert();
    }
}

#[cfg(test)]
mod tests {
    use super::InsertDeleteBarrier;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::thread::scope;
    use std::time::Duration;

    #[test]
    fn test_delete_passes_when_idle() {
        let barrier = InsertDeleteBarrier::new();
        let mut waited = false;
        barrier.begin_delete(|| waited = true);
        barrier.end_delete();
        assert!(!waited);
    }

    #[test]
    fn test_ticket_deregisters_on_drop() {
        let barrier = InsertDeleteBarrier::new();
        let a = barrier.begin_insert();
        let b = barrier.begin_insert();
        assert_eq!(barrier.inserts_in_progress(), 2);
        drop(a);
        assert_eq!(barrier.inserts_in_progress(), 1);
        drop(b);
        assert_eq!(barrier.inserts_in_progress(), 0);
    }

    #[test]
    fn test_delete_blocks_until_inserts_drain() {
        let barrier = InsertDeleteBarrier::new();
        let admitted = AtomicBool::new(false);

        scope(|s| {
            let ticket = barrier.begin_insert();
            s.spawn(|| {
                barrier.begin_delete(|| ());
                admitted.store(true, Ordering::SeqCst);
                barrier.end_delete();
            });
            std::thread::sleep(Duration::from_millis(50));
            assert!(!admitted.load(Ordering::SeqCst));
            assert_eq!(barrier.deletes_waiting(), 1);
            drop(ticket);
        });

        assert!(admitted.load(Ordering::SeqCst));
    }

    #[test]
    fn test_broadcast_wakes_every_parked_delete() {
        let barrier = InsertDeleteBarrier::new();
        let admitted = AtomicU32::new(0);

        scope(|s| {
            let ticket = barrier.begin_insert();
            for _ in 0..3 {
                s.spawn(|| {
                    barrier.begin_delete(|| ());
                    admitted.fetch_add(1, Ordering::SeqCst);
                    barrier.end_delete();
                });
            }
            // Give all three time to park.
            while barrier.deletes_waiting() < 3 {
                std::thread::sleep(Duration::from_millis(5));
            }
            drop(ticket);
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 3);
        assert_eq!(barrier.deletes_waiting(), 0);
    }

    #[test]
    fn test_wait_delete_retired_sees_retirement() {
        let barrier = InsertDeleteBarrier::new();
        let stop = AtomicBool::new(false);

        scope(|s| {
            s.spawn(|| {
                // Keep retiring deletes until the waiter has been served,
                // so the signal can not be lost before the wait parks.
                while !stop.load(Ordering::SeqCst) {
                    barrier.begin_delete(|| ());
                    barrier.end_delete();
                    std::thread::sleep(Duration::from_millis(1));
                }
            });
            barrier.wait_delete_retired();
            stop.store(true, Ordering::SeqCst);
        });
    }

    #[test]
    fn test_no_admission_while_any_insert_in_flight() {
        // One ticket stays pinned for the whole window while insert churn
        // and deletes hammer the barrier. No delete may be admitted until
        // the pinned ticket drops.
        let barrier = InsertDeleteBarrier::new();
        let admitted = AtomicU32::new(0);

        scope(|s| {
            let pinned = barrier.begin_insert();
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let _ticket = barrier.begin_insert();
                        std::hint::spin_loop();
                    }
                });
            }
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..50 {
                        barrier.begin_delete(|| ());
                        admitted.fetch_add(1, Ordering::SeqCst);
                        barrier.end_delete();
                    }
                });
            }
            std::thread::sleep(Duration::from_millis(50));
            assert_eq!(admitted.load(Ordering::SeqCst), 0);
            drop(pinned);
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 200);
    }
}
