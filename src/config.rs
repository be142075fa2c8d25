//! Store configuration
//!
//! Everything the engine needs to interpret a database file that the file
//! itself does not carry: the expected magic cookie, the character encoding,
//! the padding byte and which fields make up the primary key.
//!
//! Configuration is an explicit value handed to `RecordStore::open`; there is
//! no process-wide state.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::schema::{Charset, Schema};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Value the first four header bytes must hold (required)
    pub magic_cookie: u32,

    /// Character encoding for field names and values (default us-ascii)
    #[serde(default)]
    pub charset: Charset,

    /// Padding byte used to fill fields up to their width (default space)
    #[serde(default = "default_fill_byte")]
    pub fill_byte: u8,

    /// Field positions forming the primary key (default first field)
    #[serde(default = "default_key_fields")]
    pub key_fields: Vec<usize>,

    /// Field position holding the booking owner, empty when available
    #[serde(default)]
    pub availability_field: Option<usize>,
}

fn default_fill_byte() -> u8 {
    b' '
}

fn default_key_fields() -> Vec<usize> {
    vec![0]
}

impl StoreConfig {
    /// Configuration with defaults for everything but the cookie
    pub fn new(magic_cookie: u32) -> Self {
        Self {
            magic_cookie,
            charset: Charset::default(),
            fill_byte: default_fill_byte(),
            key_fields: default_key_fields(),
            availability_field: None,
        }
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_fill_byte(mut self, fill_byte: u8) -> Self {
        self.fill_byte = fill_byte;
        self
    }

    pub fn with_key_fields(mut self, key_fields: Vec<usize>) -> Self {
        self.key_fields = key_fields;
        self
    }

    pub fn with_availability_field(mut self, index: usize) -> Self {
        self.availability_field = Some(index);
        self
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: StoreConfig = serde_json::from_str(&content)
            .map_err(|e| StoreError::InvalidConfig(format!("invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Checks that do not need the file header
    pub fn validate(&self) -> StoreResult<()> {
        if self.key_fields.is_empty() {
            return Err(StoreError::InvalidConfig(
                "key_fields must name at least one field".into(),
            ));
        }

        let mut seen = HashSet::new();
        for index in &self.key_fields {
            if !seen.insert(index) {
                return Err(StoreError::InvalidConfig(format!(
                    "key field {} listed twice",
                    index
                )));
            }
        }

        // a non-ascii utf-8 fill can equal a continuation byte of the value
        let ascii_fill_only = matches!(self.charset, Charset::UsAscii | Charset::Utf8);
        if ascii_fill_only && !self.fill_byte.is_ascii() {
            return Err(StoreError::InvalidConfig(format!(
                "fill byte {:#04x} is not ascii, required for {}",
                self.fill_byte, self.charset
            )));
        }

        Ok(())
    }

    /// Checks field positions against the schema read from the header
    pub fn validate_against(&self, schema: &Schema) -> StoreResult<()> {
        self.validate()?;

        let count = schema.field_count();
        if let Some(index) = self.key_fields.iter().find(|i| **i >= count) {
            return Err(StoreError::InvalidConfig(format!(
                "key field {} out of range for {} fields",
                index, count
            )));
        }

        if let Some(index) = self.availability_field {
            if index >= count {
                return Err(StoreError::InvalidConfig(format!(
                    "availability field {} out of range for {} fields",
                    index, count
                )));
            }
        }

        Ok(())
    }
}
