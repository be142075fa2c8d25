//! Store metrics
//!
//! Counters only, monotonic, reset when the store is opened. Relaxed atomics
//! keep them off the critical sections.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operation counters for one open store
#[derive(Debug, Default)]
pub struct StoreMetrics {
    reads: AtomicU64,
    creates: AtomicU64,
    slots_reused: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    finds: AtomicU64,
    lock_grants: AtomicU64,
    lock_waits: AtomicU64,
    lock_timeouts: AtomicU64,
    rejected_tokens: AtomicU64,
}

macro_rules! counter {
    ($inc:ident, $field:ident) => {
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(increment_reads, reads);
    counter!(increment_creates, creates);
    counter!(increment_slots_reused, slots_reused);
    counter!(increment_updates, updates);
    counter!(increment_deletes, deletes);
    counter!(increment_finds, finds);
    counter!(increment_lock_grants, lock_grants);
    counter!(increment_lock_waits, lock_waits);
    counter!(increment_lock_timeouts, lock_timeouts);
    counter!(increment_rejected_tokens, rejected_tokens);

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            slots_reused: self.slots_reused.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            finds: self.finds.load(Ordering::Relaxed),
            lock_grants: self.lock_grants.load(Ordering::Relaxed),
            lock_waits: self.lock_waits.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
            rejected_tokens: self.rejected_tokens.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub reads: u64,
    pub creates: u64,
    pub slots_reused: u64,
    pub updates: u64,
    pub deletes: u64,
    pub finds: u64,
    pub lock_grants: u64,
    pub lock_waits: u64,
    pub lock_timeouts: u64,
    pub rejected_tokens: u64,
}
