//! Database file header
//!
//! Layout (big-endian):
//!
//! ```text
//! +----------------------+
//! | Magic Cookie         | (int32)
//! +----------------------+
//! | Record Size          | (int32, sum of field widths)
//! +----------------------+
//! | Field Count N        | (int16)
//! +----------------------+
//! | N x Field Descriptor |
//! |   Name Length        | (int16)
//! |   Name               | (Name Length bytes, configured charset)
//! |   Field Width        | (int16)
//! +----------------------+
//! ```
//!
//! Record slots start immediately after the last descriptor (`data_offset`).

use std::io::{self, Read, Write};

use super::charset::Charset;
use super::types::{FieldDef, Schema, MAX_FIELD_WIDTH};
use crate::error::{StoreError, StoreResult};

/// Parsed header: the schema plus where record data begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub schema: Schema,
    pub data_offset: u64,
}

/// Reads the header from a stream positioned at file start.
///
/// # Errors
///
/// - `UnknownFormat` if the magic cookie differs from `magic_cookie`
/// - `CorruptHeader` if the stream ends early or a length is negative
/// - `SchemaInconsistency` if the declared record size disagrees with the
///   widths, or the header declares no fields at all
///
/// Zero-width fields are accepted and always decode as empty strings. A
/// header with zero fields is rejected: such a store has no key field and
/// could never open.
pub fn read_header<R: Read>(reader: &mut R, magic_cookie: u32, charset: Charset) -> StoreResult<Header> {
    let mut offset: u64 = 0;

    let found = u32::from_be_bytes(read_array(reader, &mut offset, "magic cookie")?);
    if found != magic_cookie {
        return Err(StoreError::UnknownFormat {
            expected: magic_cookie,
            found,
        });
    }

    let record_size = i32::from_be_bytes(read_array(reader, &mut offset, "record size")?);
    let record_size = usize::try_from(record_size)
        .map_err(|_| StoreError::CorruptHeader(format!("negative record size {}", record_size)))?;

    let field_count = read_len(reader, &mut offset, "field count")?;

    let mut fields = Vec::with_capacity(field_count);
    for index in 0..field_count {
        let name_len = read_len(reader, &mut offset, "field name length")?;
        let mut name = vec![0u8; name_len];
        reader
            .read_exact(&mut name)
            .map_err(|e| truncated(e, &format!("name of field {}", index)))?;
        offset += name_len as u64;

        let width = read_len(reader, &mut offset, "field width")?;
        fields.push(FieldDef::new(charset.decode(&name), width));
    }

    let schema = Schema::with_record_size(record_size, fields)?;

    Ok(Header {
        schema,
        data_offset: offset,
    })
}

/// Writes a header for `schema`. Returns the data offset.
pub fn write_header<W: Write>(
    writer: &mut W,
    magic_cookie: u32,
    charset: Charset,
    schema: &Schema,
) -> StoreResult<u64> {
    let mut buf = Vec::with_capacity(header_len_hint(schema));

    buf.extend_from_slice(&magic_cookie.to_be_bytes());
    buf.extend_from_slice(&(schema.record_size() as i32).to_be_bytes());
    buf.extend_from_slice(&(schema.field_count() as i16).to_be_bytes());

    for field in schema.fields() {
        let name = charset.encode(&field.name).ok_or_else(|| StoreError::UnencodableField {
            field: field.name.clone(),
            charset: charset.name().to_string(),
        })?;
        if name.len() > MAX_FIELD_WIDTH {
            return Err(StoreError::SchemaInconsistency(format!(
                "field name '{}' is longer than {} bytes",
                field.name, MAX_FIELD_WIDTH
            )));
        }
        buf.extend_from_slice(&(name.len() as i16).to_be_bytes());
        buf.extend_from_slice(&name);
        buf.extend_from_slice(&(field.width as i16).to_be_bytes());
    }

    writer
        .write_all(&buf)
        .map_err(|e| StoreError::io("write header", e))?;

    Ok(buf.len() as u64)
}

fn header_len_hint(schema: &Schema) -> usize {
    10 + schema.fields().iter().map(|f| 4 + f.name.len()).sum::<usize>()
}

fn read_array<R: Read, const N: usize>(
    reader: &mut R,
    offset: &mut u64,
    what: &str,
) -> StoreResult<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| truncated(e, what))?;
    *offset += N as u64;
    Ok(buf)
}

/// Reads an int16 length, rejecting negative values.
fn read_len<R: Read>(reader: &mut R, offset: &mut u64, what: &str) -> StoreResult<usize> {
    let value = i16::from_be_bytes(read_array(reader, offset, what)?);
    usize::try_from(value).map_err(|_| StoreError::CorruptHeader(format!("negative {} {}", what, value)))
}

fn truncated(e: io::Error, what: &str) -> StoreError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        StoreError::CorruptHeader(format!("header truncated while reading {}", what))
    } else {
        StoreError::io(format!("read header {}", what), e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const COOKIE: u32 = 0xDEAD_BEEF;

    fn sample() -> Schema {
        Schema::new(vec![
            FieldDef::new("name", 32),
            FieldDef::new("city", 32),
            FieldDef::new("status", 8),
        ])
        .unwrap()
    }

    #[test]
    fn test_written_header_parses_back() {
        let mut buf = Vec::new();
        let data_offset = write_header(&mut buf, COOKIE, Charset::UsAscii, &sample()).unwrap();
        assert_eq!(data_offset, buf.len() as u64);

        let header = read_header(&mut Cursor::new(&buf), COOKIE, Charset::UsAscii).unwrap();
        assert_eq!(header.schema, sample());
        assert_eq!(header.data_offset, data_offset);
    }

    #[test]
    fn test_data_offset_matches_layout() {
        let mut buf = Vec::new();
        let data_offset = write_header(&mut buf, COOKIE, Charset::UsAscii, &sample()).unwrap();
        // 4 + 4 + 2, then (2 + name + 2) per field
        assert_eq!(data_offset, 10 + (4 + 4) + (4 + 4) + (4 + 6));
    }

    #[test]
    fn test_big_endian_layout() {
        let schema = Schema::new(vec![FieldDef::new("id", 3)]).unwrap();
        let mut buf = Vec::new();
        write_header(&mut buf, 0x0000_0101, Charset::UsAscii, &schema).unwrap();
        assert_eq!(
            buf,
            vec![0, 0, 1, 1, 0, 0, 0, 3, 0, 1, 0, 2, b'i', b'd', 0, 3]
        );
    }

    #[test]
    fn test_wrong_cookie() {
        let mut buf = Vec::new();
        write_header(&mut buf, COOKIE, Charset::UsAscii, &sample()).unwrap();

        let err = read_header(&mut Cursor::new(&buf), 0x0000_0101, Charset::UsAscii).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnknownFormat {
                expected: 0x0000_0101,
                found: COOKIE
            }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_truncated_header() {
        let mut buf = Vec::new();
        write_header(&mut buf, COOKIE, Charset::UsAscii, &sample()).unwrap();

        for cut in [2, 6, 9, 12, buf.len() - 1] {
            let err = read_header(&mut Cursor::new(&buf[..cut]), COOKIE, Charset::UsAscii).unwrap_err();
            assert_eq!(err.code(), "SLOT_CORRUPT_HEADER", "cut at {}", cut);
        }
    }

    #[test]
    fn test_declared_size_disagrees_with_widths() {
        let mut buf = Vec::new();
        write_header(&mut buf, COOKIE, Charset::UsAscii, &sample()).unwrap();
        buf[4..8].copy_from_slice(&100i32.to_be_bytes());

        let err = read_header(&mut Cursor::new(&buf), COOKIE, Charset::UsAscii).unwrap_err();
        assert_eq!(err.code(), "SLOT_SCHEMA_INCONSISTENCY");
    }

    #[test]
    fn test_zero_width_field_parses() {
        let schema = Schema::new(vec![FieldDef::new("name", 4), FieldDef::new("spare", 0)]).unwrap();
        let mut buf = Vec::new();
        write_header(&mut buf, COOKIE, Charset::UsAscii, &schema).unwrap();

        let header = read_header(&mut Cursor::new(&buf), COOKIE, Charset::UsAscii).unwrap();
        assert_eq!(header.schema.fields()[1].width, 0);
        assert_eq!(header.schema.record_size(), 4);
    }

    #[test]
    fn test_zero_fields_rejected() {
        let buf: Vec<u8> = [COOKIE.to_be_bytes().to_vec(), vec![0, 0, 0, 0, 0, 0]].concat();
        let err = read_header(&mut Cursor::new(&buf), COOKIE, Charset::UsAscii).unwrap_err();
        assert_eq!(err.code(), "SLOT_SCHEMA_INCONSISTENCY");
    }

    #[test]
    fn test_negative_field_count() {
        let mut buf = Vec::new();
        write_header(&mut buf, COOKIE, Charset::UsAscii, &sample()).unwrap();
        buf[8..10].copy_from_slice(&(-1i16).to_be_bytes());

        let err = read_header(&mut Cursor::new(&buf), COOKIE, Charset::UsAscii).unwrap_err();
        assert_eq!(err.code(), "SLOT_CORRUPT_HEADER");
    }

    #[test]
    fn test_latin1_field_names() {
        let schema = Schema::new(vec![FieldDef::new("préço", 8)]).unwrap();
        let mut buf = Vec::new();
        write_header(&mut buf, COOKIE, Charset::Latin1, &schema).unwrap();

        let header = read_header(&mut Cursor::new(&buf), COOKIE, Charset::Latin1).unwrap();
        assert_eq!(header.schema.fields()[0].name, "préço");
    }

    #[test]
    fn test_unencodable_field_name() {
        let schema = Schema::new(vec![FieldDef::new("préço", 8)]).unwrap();
        let err = write_header(&mut Vec::new(), COOKIE, Charset::UsAscii, &schema).unwrap_err();
        assert_eq!(err.code(), "SLOT_UNENCODABLE_FIELD");
    }
}
