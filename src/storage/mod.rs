//! Record storage subsystem
//!
//! Byte-level access to the slots of a database file.
//!
//! # Design Principles
//!
//! - Fixed-width slots, one deletion flag byte each
//! - Slots are never physically removed; delete flags and zeroes
//! - Deleted slot numbers are reused smallest-first
//! - Every seek plus I/O runs under one file-access lock

mod allocator;
mod codec;
mod file;

pub use allocator::{Allocation, SlotAllocator, SlotLayout};
pub use codec::{DeletionFlag, RecordCodec, StoredRecord};
pub use file::{read_exact_at, write_all_at, DataFile};
