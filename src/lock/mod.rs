//! Record locking subsystem
//!
//! Advisory, per-record locks that serialize conflicting mutations. A lock
//! is granted as an opaque token which must be presented to update, delete
//! or unlock the record.
//!
//! State per record number: `Unlocked -> Locked(token) -> Unlocked`, moved
//! only by acquire and release. Locks still held when the store closes are
//! caller bugs and are not released automatically.

mod table;
mod token;

pub use table::{Grant, LockTable};
pub use token::{LockToken, TokenGenerator};
