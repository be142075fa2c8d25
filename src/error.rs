//! Store error taxonomy
//!
//! Every failure the engine can report is a `StoreError` variant. Errors are
//! structured values: callers inspect `kind()`, `code()` and `severity()`
//! rather than parsing the display text.
//!
//! Error codes:
//! - SLOT_UNKNOWN_FORMAT (FATAL)
//! - SLOT_CORRUPT_HEADER (FATAL)
//! - SLOT_SCHEMA_INCONSISTENCY (FATAL)
//! - SLOT_INVALID_CONFIG (FATAL)
//! - SLOT_CORRUPT_RECORD (ERROR)
//! - SLOT_RECORD_NOT_FOUND (ERROR)
//! - SLOT_LOCK_NOT_HELD (ERROR)
//! - SLOT_DUPLICATE_KEY (ERROR)
//! - SLOT_SECURITY_VIOLATION (ERROR)
//! - SLOT_FIELD_TOO_LONG (ERROR)
//! - SLOT_UNENCODABLE_FIELD (ERROR)
//! - SLOT_FIELD_COUNT_MISMATCH (ERROR)
//! - SLOT_LOCK_TIMEOUT (ERROR)
//! - SLOT_SCAN_FAILED (ERROR)
//! - SLOT_IO_ERROR (ERROR)

use std::fmt;
use std::io;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Severity levels for store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, store stays usable
    Error,
    /// Store cannot be opened
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Coarse classification a transport layer can map onto its own wire errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not a database file of the expected format
    Format,
    /// Header or configuration disagrees with the file
    Schema,
    /// Slot bytes are not a valid record
    Corruption,
    /// Missing, deleted or never-locked record
    NotFound,
    /// Key projection collides with a live record
    Duplicate,
    /// Lock token does not match the current holder
    Security,
    /// Field value cannot be encoded into its slot
    Field,
    /// Bounded lock wait elapsed
    Timeout,
    /// Underlying file I/O failed
    Io,
}

/// Store error
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown database format: magic cookie {found:#010x}, expected {expected:#010x}")]
    UnknownFormat { expected: u32, found: u32 },

    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    #[error("schema inconsistency: {0}")]
    SchemaInconsistency(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("corrupt record {record_number}: invalid deletion flag {flag:#04x}")]
    CorruptRecord { record_number: u32, flag: u8 },

    #[error("record {0} not found")]
    RecordNotFound(u32),

    #[error("record {0} is not locked")]
    LockNotHeld(u32),

    #[error("duplicate key: record {0} already holds this key")]
    DuplicateKey(u32),

    #[error("security violation: lock token does not match holder of record {0}")]
    SecurityViolation(u32),

    #[error("field '{field}' needs {actual} bytes, width is {width}")]
    FieldTooLong {
        field: String,
        width: usize,
        actual: usize,
    },

    #[error("field '{field}' cannot be encoded as {charset}")]
    UnencodableField { field: String, charset: String },

    #[error("expected {expected} fields, got {actual}")]
    FieldCountMismatch { expected: usize, actual: usize },

    #[error("timed out waiting for lock on record {0}")]
    LockTimeout(u32),

    #[error("scan failed at record {record_number}: {source}")]
    ScanFailed {
        record_number: u32,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Wrap an I/O error with a short description of what was attempted
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::UnknownFormat { .. } => "SLOT_UNKNOWN_FORMAT",
            StoreError::CorruptHeader(_) => "SLOT_CORRUPT_HEADER",
            StoreError::SchemaInconsistency(_) => "SLOT_SCHEMA_INCONSISTENCY",
            StoreError::InvalidConfig(_) => "SLOT_INVALID_CONFIG",
            StoreError::CorruptRecord { .. } => "SLOT_CORRUPT_RECORD",
            StoreError::RecordNotFound(_) => "SLOT_RECORD_NOT_FOUND",
            StoreError::LockNotHeld(_) => "SLOT_LOCK_NOT_HELD",
            StoreError::DuplicateKey(_) => "SLOT_DUPLICATE_KEY",
            StoreError::SecurityViolation(_) => "SLOT_SECURITY_VIOLATION",
            StoreError::FieldTooLong { .. } => "SLOT_FIELD_TOO_LONG",
            StoreError::UnencodableField { .. } => "SLOT_UNENCODABLE_FIELD",
            StoreError::FieldCountMismatch { .. } => "SLOT_FIELD_COUNT_MISMATCH",
            StoreError::LockTimeout(_) => "SLOT_LOCK_TIMEOUT",
            StoreError::ScanFailed { .. } => "SLOT_SCAN_FAILED",
            StoreError::Io { .. } => "SLOT_IO_ERROR",
        }
    }

    /// Returns the coarse error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::UnknownFormat { .. } | StoreError::CorruptHeader(_) => ErrorKind::Format,
            StoreError::SchemaInconsistency(_) | StoreError::InvalidConfig(_) => ErrorKind::Schema,
            StoreError::CorruptRecord { .. } => ErrorKind::Corruption,
            StoreError::RecordNotFound(_) | StoreError::LockNotHeld(_) => ErrorKind::NotFound,
            StoreError::DuplicateKey(_) => ErrorKind::Duplicate,
            StoreError::SecurityViolation(_) => ErrorKind::Security,
            StoreError::FieldTooLong { .. }
            | StoreError::UnencodableField { .. }
            | StoreError::FieldCountMismatch { .. } => ErrorKind::Field,
            StoreError::LockTimeout(_) => ErrorKind::Timeout,
            StoreError::ScanFailed { .. } | StoreError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        match self.kind() {
            ErrorKind::Format | ErrorKind::Schema => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Returns whether this error prevents the store from opening
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// The record number this error is about, if any
    pub fn record_number(&self) -> Option<u32> {
        match self {
            StoreError::CorruptRecord { record_number, .. }
            | StoreError::ScanFailed { record_number, .. } => Some(*record_number),
            StoreError::RecordNotFound(n)
            | StoreError::LockNotHeld(n)
            | StoreError::DuplicateKey(n)
            | StoreError::SecurityViolation(n)
            | StoreError::LockTimeout(n) => Some(*n),
            _ => None,
        }
    }
}
