//! CLI-specific error types
//!
//! CLI errors carry a stable code that ends up in the JSON error response.
//! Engine and booking errors keep their own codes.

use std::fmt;
use std::io;

use crate::booking::BookingError;
use crate::error::StoreError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// Database file already exists
    AlreadyInitialized,
    /// Config has no schema for init
    MissingSchema,
    /// Argument does not fit the open schema
    InvalidArgument,
    /// Error reported by the store or the booking workflow
    Operation(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "SLOT_CLI_CONFIG_ERROR",
            Self::IoError => "SLOT_CLI_IO_ERROR",
            Self::AlreadyInitialized => "SLOT_CLI_ALREADY_INITIALIZED",
            Self::MissingSchema => "SLOT_CLI_MISSING_SCHEMA",
            Self::InvalidArgument => "SLOT_CLI_INVALID_ARGUMENT",
            Self::Operation(code) => code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn already_initialized(path: &std::path::Path) -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            format!("database file {} already exists", path.display()),
        )
    }

    pub fn missing_schema() -> Self {
        Self::new(
            CliErrorCode::MissingSchema,
            "config has no 'fields' to initialize the database with",
        )
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::new(CliErrorCode::Operation(e.code()), e.to_string())
    }
}

impl From<BookingError> for CliError {
    fn from(e: BookingError) -> Self {
        Self::new(CliErrorCode::Operation(e.code()), e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
