//! Record store
//!
//! The public face of the engine: a `RecordStore` opened on one database
//! file, and the `RecordAccess` trait it implements.
//!
//! # Guarantees
//!
//! - At most one holder per record lock at any instant
//! - Update and delete require the current holder's token
//! - No two live records share a key projection
//! - Reads never observe a partially written slot
//! - Every successful mutation is written and synced before returning

mod access;
mod record_store;

pub use access::RecordAccess;
pub use record_store::{matches_criteria, RecordStore};
