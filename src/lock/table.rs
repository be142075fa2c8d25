//! Per-record lock table
//!
//! Each record number is either unlocked or locked by exactly one token.
//! Callers that find a record locked wait on a condition variable that
//! belongs to that record alone, created on first contention and dropped
//! once nobody holds or waits for the record. A release wakes one waiter.
//!
//! Waiters are served best-effort, not FIFO: a release wakes one waiter, but
//! a caller arriving in between may take the lock first.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::token::{LockToken, TokenGenerator};
use crate::error::{StoreError, StoreResult};

/// Result of a successful acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub token: LockToken,
    /// Whether the caller had to wait for another holder
    pub waited: bool,
}

#[derive(Debug)]
struct LockEntry {
    holder: Option<LockToken>,
    waiters: usize,
    released: Arc<Condvar>,
}

impl LockEntry {
    fn new() -> Self {
        Self {
            holder: None,
            waiters: 0,
            released: Arc::new(Condvar::new()),
        }
    }
}

/// Advisory locks keyed by record number
#[derive(Debug, Default)]
pub struct LockTable {
    entries: Mutex<HashMap<u32, LockEntry>>,
    tokens: TokenGenerator,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<u32, LockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the record is free, then takes it with a fresh token.
    pub fn acquire(&self, record_number: u32) -> Grant {
        match self.acquire_until(record_number, None) {
            Some(grant) => grant,
            None => unreachable!("acquire without deadline cannot time out"),
        }
    }

    /// Like `acquire`, but gives up at `deadline` with `LockTimeout`.
    ///
    /// An abandoned wait leaves no trace in the table.
    pub fn acquire_before(&self, record_number: u32, deadline: Instant) -> StoreResult<Grant> {
        self.acquire_until(record_number, Some(deadline))
            .ok_or(StoreError::LockTimeout(record_number))
    }

    fn acquire_until(&self, record_number: u32, deadline: Option<Instant>) -> Option<Grant> {
        let mut entries = self.entries();
        let mut waited = false;

        loop {
            let entry = entries.entry(record_number).or_insert_with(LockEntry::new);
            if entry.holder.is_none() {
                let token = self.tokens.next_token();
                entry.holder = Some(token);
                return Some(Grant { token, waited });
            }

            // The record is held by someone else, so the entry outlives us.
            let now = Instant::now();
            if deadline.map_or(false, |d| now >= d) {
                return None;
            }

            waited = true;
            entry.waiters += 1;
            let released = Arc::clone(&entry.released);

            entries = match deadline {
                None => released.wait(entries).unwrap_or_else(PoisonError::into_inner),
                Some(d) => {
                    released
                        .wait_timeout(entries, d.saturating_duration_since(now))
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };

            if let Some(entry) = entries.get_mut(&record_number) {
                entry.waiters -= 1;
            }
        }
    }

    /// Releases the lock held with `token`, waking one waiter.
    ///
    /// # Errors
    ///
    /// - `LockNotHeld` if the record is not locked
    /// - `SecurityViolation` if `token` is not the current holder's
    pub fn release(&self, record_number: u32, token: LockToken) -> StoreResult<()> {
        let mut entries = self.entries();

        let entry = match entries.get_mut(&record_number) {
            Some(entry) if entry.holder.is_some() => entry,
            _ => return Err(StoreError::LockNotHeld(record_number)),
        };

        if entry.holder != Some(token) {
            return Err(StoreError::SecurityViolation(record_number));
        }

        entry.holder = None;
        if entry.waiters > 0 {
            entry.released.notify_one();
        } else {
            entries.remove(&record_number);
        }

        Ok(())
    }

    /// Non-blocking ownership check used before mutating a record.
    pub fn validate(&self, record_number: u32, token: LockToken) -> bool {
        self.entries()
            .get(&record_number)
            .map_or(false, |entry| entry.holder == Some(token))
    }

    pub fn is_locked(&self, record_number: u32) -> bool {
        self.entries()
            .get(&record_number)
            .map_or(false, |entry| entry.holder.is_some())
    }

    /// Number of records currently locked
    pub fn held_count(&self) -> usize {
        self.entries()
            .values()
            .filter(|entry| entry.holder.is_some())
            .count()
    }

    /// Callers currently waiting for `record_number`
    #[cfg(test)]
    fn waiter_count(&self, record_number: u32) -> usize {
        self.entries()
            .get(&record_number)
            .map_or(0, |entry| entry.waiters)
    }

    /// Records with an entry in the table, held or waited on
    #[cfg(test)]
    fn tracked_count(&self) -> usize {
        self.entries().len()
    }
}
