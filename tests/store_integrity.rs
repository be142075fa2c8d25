//! Record Store Integrity Tests
//!
//! Tests for:
//! - Records read back exactly as written
//! - Deleted slots are invisible and reused smallest-first
//! - Find returns live records in ascending order
//! - Corruption is reported, never silently returned as data
//! - State survives reopening the file

use slotstore::{FieldDef, RecordStore, Schema, StoreConfig, StoreError};
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

const COOKIE: u32 = 0xDEAD_BEEF;

/// Header length for the test schema: 10 fixed bytes plus
/// (2 + 4 + 2) + (2 + 4 + 2) + (2 + 6 + 2) for the three fields.
const DATA_OFFSET: u64 = 36;
const SLOT_SIZE: u64 = 73;

fn test_schema() -> Schema {
    Schema::new(vec![
        FieldDef::new("name", 32),
        FieldDef::new("city", 32),
        FieldDef::new("status", 8),
    ])
    .unwrap()
}

fn create_store(dir: &TempDir) -> RecordStore {
    RecordStore::create_file(&db_path(dir), StoreConfig::new(COOKIE), &test_schema()).unwrap()
}

fn db_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("hotels.db")
}

fn reopen(dir: &TempDir) -> RecordStore {
    RecordStore::open(&db_path(dir), StoreConfig::new(COOKIE)).unwrap()
}

fn all() -> Vec<Option<String>> {
    vec![None, None, None]
}

fn poke(path: &Path, offset: u64, byte: u8) {
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&[byte]).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Walkthrough
// =============================================================================

#[test]
fn test_booking_walkthrough() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);

    assert_eq!(store.create(&["Acme", "Lisbon", ""]).unwrap(), 0);
    assert_eq!(store.find(&[None, Some("Lis"), None]).unwrap(), vec![0]);

    let token = store.lock(0).unwrap();
    store.update(0, &["Acme", "Lisbon", "X1"], token).unwrap();
    assert_eq!(store.read(0).unwrap(), vec!["Acme", "Lisbon", "X1"]);
    store.unlock(0, token).unwrap();

    // the token died with the unlock
    let err = store.delete(0, token).unwrap_err();
    assert!(matches!(err, StoreError::SecurityViolation(0)));
    assert_eq!(store.read(0).unwrap(), vec!["Acme", "Lisbon", "X1"]);
}

// =============================================================================
// Create / Read / Delete
// =============================================================================

#[test]
fn test_created_record_reads_back_and_is_not_free() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);

    let n = store.create(&["Grand", "Faro", ""]).unwrap();
    assert_eq!(store.read(n).unwrap(), vec!["Grand", "Faro", ""]);
    assert!(!store.free_slots().contains(&n));
}

#[test]
fn test_read_returns_independent_copies() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    store.create(&["Grand", "Faro", ""]).unwrap();

    let mut first = store.read(0).unwrap();
    first[1] = "Elsewhere".to_string();
    assert_eq!(store.read(0).unwrap()[1], "Faro");
}

#[test]
fn test_delete_then_create_reuses_smallest_slot() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    for name in ["A", "B", "C", "D"] {
        store.create(&[name, "x", ""]).unwrap();
    }

    for n in [2, 1] {
        let token = store.lock(n).unwrap();
        store.delete(n, token).unwrap();
        store.unlock(n, token).unwrap();
        assert!(matches!(store.read(n), Err(StoreError::RecordNotFound(_))));
    }
    assert_eq!(store.free_slots(), vec![1, 2]);

    assert_eq!(store.create(&["E", "x", ""]).unwrap(), 1);
    assert_eq!(store.create(&["F", "x", ""]).unwrap(), 2);
    assert_eq!(store.create(&["G", "x", ""]).unwrap(), 4);
    assert_eq!(store.record_count(), 5);
    assert_eq!(store.metrics().slots_reused, 2);
}

#[test]
fn test_deleted_key_can_be_created_again() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    store.create(&["Acme", "Lisbon", ""]).unwrap();

    let token = store.lock(0).unwrap();
    store.delete(0, token).unwrap();
    store.unlock(0, token).unwrap();

    assert_eq!(store.create(&["Acme", "Porto", ""]).unwrap(), 0);
}

#[test]
fn test_deleted_slot_is_zeroed_on_disk() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    store.create(&["Acme", "Lisbon", ""]).unwrap();

    let token = store.lock(0).unwrap();
    store.delete(0, token).unwrap();
    store.unlock(0, token).unwrap();

    let bytes = fs::read(db_path(&dir)).unwrap();
    let slot = &bytes[DATA_OFFSET as usize..(DATA_OFFSET + SLOT_SIZE) as usize];
    assert_eq!(slot[0], 1);
    assert!(slot[1..].iter().all(|b| *b == 0));
}

// =============================================================================
// Find
// =============================================================================

#[test]
fn test_find_all_returns_live_records_ascending() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    for name in ["A", "B", "C"] {
        store.create(&[name, "x", ""]).unwrap();
    }
    let token = store.lock(1).unwrap();
    store.delete(1, token).unwrap();
    store.unlock(1, token).unwrap();

    assert_eq!(store.find(&all()).unwrap(), vec![0, 2]);
}

#[test]
fn test_find_by_prefix() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    store.create(&["Palace", "Lisbon", ""]).unwrap();
    store.create(&["Pension", "Lagos", ""]).unwrap();
    store.create(&["Inn", "Lisbon", ""]).unwrap();

    assert_eq!(store.find(&[Some("P"), None, None]).unwrap(), vec![0, 1]);
    assert_eq!(store.find(&[Some("Pa"), None, None]).unwrap(), vec![0]);
    assert_eq!(store.find(&[None, Some("L"), None]).unwrap(), vec![0, 1, 2]);
    assert_eq!(store.find(&[Some("P"), Some("Lis"), None]).unwrap(), vec![0]);
    assert!(store.find(&[Some("Px"), None, None]).unwrap().is_empty());
    assert!(store.find(&[Some("palace"), None, None]).unwrap().is_empty());
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_reopen_restores_records_and_free_slots() {
    let dir = TempDir::new().unwrap();
    {
        let store = create_store(&dir);
        store.create(&["A", "x", ""]).unwrap();
        store.create(&["B", "y", "1"]).unwrap();
        let token = store.lock(0).unwrap();
        store.delete(0, token).unwrap();
        store.unlock(0, token).unwrap();
    }

    let store = reopen(&dir);
    assert_eq!(store.record_count(), 2);
    assert_eq!(store.free_slots(), vec![0]);
    assert_eq!(store.read(1).unwrap(), vec!["B", "y", "1"]);
    assert_eq!(store.create(&["C", "z", ""]).unwrap(), 0);
}

#[test]
fn test_create_file_refuses_existing() {
    let dir = TempDir::new().unwrap();
    let _store = create_store(&dir);

    let err = RecordStore::create_file(&db_path(&dir), StoreConfig::new(COOKIE), &test_schema())
        .unwrap_err();
    assert_eq!(err.code(), "SLOT_IO_ERROR");
}

// =============================================================================
// Corruption and format errors
// =============================================================================

#[test]
fn test_wrong_cookie_is_unknown_format() {
    let dir = TempDir::new().unwrap();
    drop(create_store(&dir));

    let err = RecordStore::open(&db_path(&dir), StoreConfig::new(0x0101)).unwrap_err();
    assert!(matches!(
        err,
        StoreError::UnknownFormat {
            expected: 0x0101,
            found: COOKIE
        }
    ));
    assert!(err.is_fatal());
}

#[test]
fn test_partial_slot_is_schema_inconsistency() {
    let dir = TempDir::new().unwrap();
    {
        let store = create_store(&dir);
        store.create(&["A", "x", ""]).unwrap();
    }
    let mut bytes = fs::read(db_path(&dir)).unwrap();
    bytes.truncate(bytes.len() - 5);
    fs::write(db_path(&dir), bytes).unwrap();

    let err = RecordStore::open(&db_path(&dir), StoreConfig::new(COOKIE)).unwrap_err();
    assert_eq!(err.code(), "SLOT_SCHEMA_INCONSISTENCY");
}

#[test]
fn test_truncated_header_is_corrupt_header() {
    let dir = TempDir::new().unwrap();
    drop(create_store(&dir));
    let mut bytes = fs::read(db_path(&dir)).unwrap();
    bytes.truncate(20);
    fs::write(db_path(&dir), bytes).unwrap();

    let err = RecordStore::open(&db_path(&dir), StoreConfig::new(COOKIE)).unwrap_err();
    assert_eq!(err.code(), "SLOT_CORRUPT_HEADER");
}

#[test]
fn test_corrupt_flag_fails_open() {
    let dir = TempDir::new().unwrap();
    {
        let store = create_store(&dir);
        store.create(&["A", "x", ""]).unwrap();
        store.create(&["B", "x", ""]).unwrap();
    }
    poke(&db_path(&dir), DATA_OFFSET + SLOT_SIZE, 7);

    let err = RecordStore::open(&db_path(&dir), StoreConfig::new(COOKIE)).unwrap_err();
    assert!(matches!(
        err,
        StoreError::CorruptRecord {
            record_number: 1,
            flag: 7
        }
    ));
}

#[test]
fn test_corrupt_flag_on_open_store() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    for name in ["A", "B", "C"] {
        store.create(&[name, "x", ""]).unwrap();
    }
    poke(&db_path(&dir), DATA_OFFSET + SLOT_SIZE, 0x42);

    assert!(matches!(
        store.read(1),
        Err(StoreError::CorruptRecord { record_number: 1, .. })
    ));
    assert_eq!(store.find(&all()).unwrap(), vec![0, 2]);
    assert!(matches!(store.lock(1), Err(StoreError::CorruptRecord { .. })));
}

#[test]
fn test_config_index_out_of_range_fails_open() {
    let dir = TempDir::new().unwrap();
    drop(create_store(&dir));

    let config = StoreConfig::new(COOKIE).with_availability_field(3);
    let err = RecordStore::open(&db_path(&dir), config).unwrap_err();
    assert_eq!(err.code(), "SLOT_INVALID_CONFIG");
}
