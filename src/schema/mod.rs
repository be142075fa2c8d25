//! Schema subsystem
//!
//! The schema is derived from the database file header and describes the
//! fixed-width fields of every record.
//!
//! # Design Principles
//!
//! - Built once at open, immutable afterwards
//! - Record size always equals the sum of field widths
//! - Header parsing and writing are exact inverses

mod charset;
mod header;
mod types;

pub use charset::Charset;
pub use header::{read_header, write_header, Header};
pub use types::{FieldDef, Schema, MAX_FIELD_WIDTH};
