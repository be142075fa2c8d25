//! Record codec
//!
//! Slot format:
//!
//! ```text
//! +------------------+
//! | Deletion Flag    | (u8: 0 = live, 1 = deleted)
//! +------------------+
//! | Field 0          | (width 0 bytes, fill-padded)
//! +------------------+
//! | ...              |
//! +------------------+
//! | Field N-1        | (width N-1 bytes, fill-padded)
//! +------------------+
//! ```
//!
//! Encoding right-pads every field with the fill byte to exactly its width.
//! Decoding strips trailing fill bytes before converting to a string.

use crate::error::{StoreError, StoreResult};
use crate::schema::{Charset, Schema};

/// One-byte marker preceding every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionFlag {
    Live = 0,
    Deleted = 1,
}

impl DeletionFlag {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Any byte other than 0 or 1 is corrupt data.
    pub fn from_byte(record_number: u32, byte: u8) -> StoreResult<Self> {
        match byte {
            0 => Ok(DeletionFlag::Live),
            1 => Ok(DeletionFlag::Deleted),
            flag => Err(StoreError::CorruptRecord {
                record_number,
                flag,
            }),
        }
    }

    pub fn is_deleted(self) -> bool {
        self == DeletionFlag::Deleted
    }
}

/// A decoded slot. Always an independent copy of the stored bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub fields: Vec<String>,
    pub deleted: bool,
}

/// Converts between field strings and fixed-size payloads.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    schema: Schema,
    charset: Charset,
    fill_byte: u8,
}

impl RecordCodec {
    pub fn new(schema: Schema, charset: Charset, fill_byte: u8) -> Self {
        Self {
            schema,
            charset,
            fill_byte,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Encode fields into a payload of exactly `record_size` bytes.
    ///
    /// # Errors
    ///
    /// - `FieldCountMismatch` if `fields` does not have one value per schema field
    /// - `UnencodableField` if a value has characters outside the charset
    /// - `FieldTooLong` if an encoded value is wider than its field
    pub fn encode<S: AsRef<str>>(&self, fields: &[S]) -> StoreResult<Vec<u8>> {
        self.check_count(fields.len())?;

        let mut payload = Vec::with_capacity(self.schema.record_size());
        for (def, value) in self.schema.fields().iter().zip(fields) {
            let bytes = self
                .charset
                .encode(value.as_ref())
                .ok_or_else(|| StoreError::UnencodableField {
                    field: def.name.clone(),
                    charset: self.charset.name().to_string(),
                })?;

            if bytes.len() > def.width {
                return Err(StoreError::FieldTooLong {
                    field: def.name.clone(),
                    width: def.width,
                    actual: bytes.len(),
                });
            }

            payload.extend_from_slice(&bytes);
            payload.resize(payload.len() + def.width - bytes.len(), self.fill_byte);
        }

        debug_assert_eq!(payload.len(), self.schema.record_size());
        Ok(payload)
    }

    /// Decode a payload into field strings with trailing fill removed.
    pub fn decode(&self, payload: &[u8]) -> Vec<String> {
        (0..self.schema.field_count())
            .filter_map(|index| self.schema.field_range(index))
            .map(|range| {
                let raw = &payload[range];
                let end = raw
                    .iter()
                    .rposition(|&b| b != self.fill_byte)
                    .map_or(0, |p| p + 1);
                self.charset.decode(&raw[..end])
            })
            .collect()
    }

    /// Encode a live slot: flag byte followed by the payload.
    pub fn encode_slot<S: AsRef<str>>(&self, fields: &[S]) -> StoreResult<Vec<u8>> {
        let payload = self.encode(fields)?;
        let mut slot = Vec::with_capacity(self.schema.slot_size());
        slot.push(DeletionFlag::Live.as_byte());
        slot.extend_from_slice(&payload);
        Ok(slot)
    }

    /// Bytes written over a deleted slot: flag 1 and a zeroed payload.
    pub fn deleted_slot(&self) -> Vec<u8> {
        let mut slot = vec![0u8; self.schema.slot_size()];
        slot[0] = DeletionFlag::Deleted.as_byte();
        slot
    }

    /// Decode a full slot (flag + payload).
    pub fn decode_slot(&self, record_number: u32, slot: &[u8]) -> StoreResult<StoredRecord> {
        debug_assert_eq!(slot.len(), self.schema.slot_size());
        let flag = DeletionFlag::from_byte(record_number, slot[0])?;
        Ok(StoredRecord {
            fields: self.decode(&slot[1..]),
            deleted: flag.is_deleted(),
        })
    }

    /// Fails with `FieldCountMismatch` unless `actual` equals the field count.
    pub fn check_count(&self, actual: usize) -> StoreResult<()> {
        let expected = self.schema.field_count();
        if actual != expected {
            return Err(StoreError::FieldCountMismatch { expected, actual });
        }
        Ok(())
    }
}
