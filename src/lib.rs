//! slotstore - a schema-driven, fixed-width record store
//!
//! One database file, a self-describing header, and per-record locks that
//! serialize conflicting updates across threads of one process.

pub mod booking;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod observability;
pub mod schema;
pub mod storage;
pub mod store;

pub use config::StoreConfig;
pub use error::{ErrorKind, StoreError, StoreResult};
pub use lock::LockToken;
pub use schema::{Charset, FieldDef, Schema};
pub use store::{RecordAccess, RecordStore};
