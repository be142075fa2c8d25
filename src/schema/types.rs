//! Schema type definitions
//!
//! A schema is the ordered list of fixed-width fields read from the file
//! header. It is built once when the store opens and never changes.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Largest field width or name length the header can express (int16).
pub const MAX_FIELD_WIDTH: usize = i16::MAX as usize;

/// One fixed-width field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Column name as stored in the header
    pub name: String,
    /// Width of the field in encoded bytes
    pub width: usize,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

/// Immutable record layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    record_size: usize,
    fields: Vec<FieldDef>,
    /// Byte offset of each field inside the payload
    offsets: Vec<usize>,
}

impl Schema {
    /// Build a schema whose record size is the sum of the field widths.
    pub fn new(fields: Vec<FieldDef>) -> StoreResult<Self> {
        let record_size = fields.iter().map(|f| f.width).sum();
        Self::with_record_size(record_size, fields)
    }

    /// Build a schema from a declared record size, as read from a header.
    ///
    /// Fails with `SchemaInconsistency` when the declared size disagrees with
    /// the field widths.
    pub fn with_record_size(record_size: usize, fields: Vec<FieldDef>) -> StoreResult<Self> {
        if fields.is_empty() {
            return Err(StoreError::SchemaInconsistency(
                "schema must declare at least one field".into(),
            ));
        }
        if fields.len() > MAX_FIELD_WIDTH {
            return Err(StoreError::SchemaInconsistency(format!(
                "{} fields exceed the header limit of {}",
                fields.len(),
                MAX_FIELD_WIDTH
            )));
        }

        for field in &fields {
            if field.width > MAX_FIELD_WIDTH {
                return Err(StoreError::SchemaInconsistency(format!(
                    "field '{}' has unsupported width {}",
                    field.name, field.width
                )));
            }
        }

        let total: usize = fields.iter().map(|f| f.width).sum();
        if total != record_size {
            return Err(StoreError::SchemaInconsistency(format!(
                "record size {} does not match field widths totalling {}",
                record_size, total
            )));
        }
        if record_size > i32::MAX as usize {
            return Err(StoreError::SchemaInconsistency(format!(
                "record size {} exceeds the header limit",
                record_size
            )));
        }

        let offsets = fields
            .iter()
            .scan(0usize, |start, field| {
                let offset = *start;
                *start += field.width;
                Some(offset)
            })
            .collect();

        Ok(Self {
            record_size,
            fields,
            offsets,
        })
    }

    /// Payload size in bytes, excluding the deletion flag
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Size of one slot on disk: deletion flag plus payload
    pub fn slot_size(&self) -> usize {
        self.record_size + 1
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Position of the named field
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Byte range of a field inside the payload
    pub fn field_range(&self, index: usize) -> Option<std::ops::Range<usize>> {
        let start = *self.offsets.get(index)?;
        Some(start..start + self.fields[index].width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new(vec![
            FieldDef::new("name", 32),
            FieldDef::new("city", 32),
            FieldDef::new("status", 8),
        ])
        .unwrap()
    }

    #[test]
    fn test_record_size_is_sum_of_widths() {
        let schema = sample();
        assert_eq!(schema.record_size(), 72);
        assert_eq!(schema.slot_size(), 73);
        assert_eq!(schema.field_count(), 3);
    }

    #[test]
    fn test_field_ranges_are_cumulative() {
        let schema = sample();
        assert_eq!(schema.field_range(0), Some(0..32));
        assert_eq!(schema.field_range(1), Some(32..64));
        assert_eq!(schema.field_range(2), Some(64..72));
        assert_eq!(schema.field_range(3), None);
    }

    #[test]
    fn test_declared_size_mismatch() {
        let err = Schema::with_record_size(10, vec![FieldDef::new("a", 4), FieldDef::new("b", 4)])
            .unwrap_err();
        assert_eq!(err.code(), "SLOT_SCHEMA_INCONSISTENCY");
    }

    #[test]
    fn test_zero_width_field() {
        let schema = Schema::new(vec![FieldDef::new("a", 4), FieldDef::new("flag", 0)]).unwrap();
        assert_eq!(schema.record_size(), 4);
        assert_eq!(schema.field_range(1), Some(4..4));
    }

    #[test]
    fn test_width_over_header_limit_rejected() {
        assert!(Schema::new(vec![FieldDef::new("a", MAX_FIELD_WIDTH + 1)]).is_err());
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(Schema::new(vec![]).is_err());
    }

    #[test]
    fn test_field_index_by_name() {
        let schema = sample();
        assert_eq!(schema.field_index("city"), Some(1));
        assert_eq!(schema.field_index("owner"), None);
    }
}
