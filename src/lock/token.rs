//! Lock tokens
//!
//! A token proves ownership of a record lock. Tokens come from a per-table
//! counter with a random starting point, so two outstanding tokens never
//! collide and tokens from different tables are unlikely to coincide.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque proof of holding a record lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockToken(u64);

impl LockToken {
    /// Rebuild a token received over a transport.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Hands out distinct tokens
#[derive(Debug)]
pub struct TokenGenerator {
    next: AtomicU64,
}

impl TokenGenerator {
    pub fn new() -> Self {
        Self::starting_at(rand::random())
    }

    /// Deterministic start, for tests.
    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: AtomicU64::new(seed),
        }
    }

    pub fn next_token(&self) -> LockToken {
        LockToken(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}
