//! Record store
//!
//! Composes the header parser, record codec, slot allocator and lock table
//! into the create/read/update/delete/find/lock/unlock operation set.
//!
//! Three independent mutexes guard shared state:
//!
//! - the file-access lock (inside `DataFile`), held for one seek plus I/O
//! - the allocator lock, guarding the free-slot set and slot count
//! - the lock-table lock, guarding record lock entries
//!
//! A fourth mutex serializes `create`, so the duplicate-key check and the
//! insert that follows it are atomic with respect to other creates. No
//! operation holds the file-access lock while waiting for a record lock.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::lock::{Grant, LockTable, LockToken};
use crate::observability::{self, Event, MetricsSnapshot, StoreMetrics};
use crate::schema::{self, Schema};
use crate::storage::{
    read_exact_at, write_all_at, Allocation, DataFile, DeletionFlag, RecordCodec, SlotAllocator, SlotLayout,
};

/// A single-file record store
#[derive(Debug)]
pub struct RecordStore {
    config: StoreConfig,
    codec: RecordCodec,
    layout: SlotLayout,
    file: DataFile,
    allocator: Mutex<SlotAllocator>,
    create_serial: Mutex<()>,
    locks: LockTable,
    metrics: StoreMetrics,
}

impl RecordStore {
    /// Opens an existing database file.
    ///
    /// Parses the header, checks the file length against the schema and
    /// collects deleted slot numbers in one scan of the record region.
    ///
    /// # Errors
    ///
    /// - `UnknownFormat` if the magic cookie does not match the config
    /// - `CorruptHeader` if the header is truncated or malformed
    /// - `SchemaInconsistency` if the file length is not header plus whole slots
    /// - `InvalidConfig` if the config names fields the schema does not have
    /// - `CorruptRecord` if a slot carries an invalid deletion flag
    pub fn open(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        let path_str = path.display().to_string();
        match Self::open_inner(path, config) {
            Ok(store) => {
                let records = store.record_count().to_string();
                let free = store.free_slots().len().to_string();
                observability::log_event(
                    Event::StoreOpen,
                    &[("path", path_str.as_str()), ("records", records.as_str()), ("free_slots", free.as_str())],
                );
                Ok(store)
            }
            Err(e) => {
                observability::log_event(
                    Event::StoreOpenFailed,
                    &[("path", path_str.as_str()), ("code", e.code()), ("reason", e.to_string().as_str())],
                );
                Err(e)
            }
        }
    }

    fn open_inner(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let file = DataFile::open(path)?;

        let header = file.access(|f| {
            f.seek(SeekFrom::Start(0))
                .map_err(|e| StoreError::io("seek to header", e))?;
            schema::read_header(&mut BufReader::new(f), config.magic_cookie, config.charset)
        })?;
        config.validate_against(&header.schema)?;

        let layout = SlotLayout::new(header.data_offset, header.schema.slot_size());
        let (record_count, free) = Self::scan_slots(&file, layout)?;

        Ok(Self {
            codec: RecordCodec::new(header.schema, config.charset, config.fill_byte),
            config,
            layout,
            file,
            allocator: Mutex::new(SlotAllocator::new(record_count, free)),
            create_serial: Mutex::new(()),
            locks: LockTable::new(),
            metrics: StoreMetrics::new(),
        })
    }

    /// Counts slots and collects the deleted ones, checking that the file
    /// is exactly header plus whole slots.
    fn scan_slots(file: &DataFile, layout: SlotLayout) -> StoreResult<(u32, BTreeSet<u32>)> {
        file.access(|f| {
            let file_len = f
                .metadata()
                .map_err(|e| StoreError::io("read file metadata", e))?
                .len();
            let (slots, leftover) = layout.slots_in(file_len);
            if file_len < layout.data_offset() || leftover != 0 {
                return Err(StoreError::SchemaInconsistency(format!(
                    "file length {} is not data offset {} plus whole slots of {} bytes",
                    file_len,
                    layout.data_offset(),
                    layout.slot_size()
                )));
            }
            let record_count = u32::try_from(slots).map_err(|_| {
                StoreError::SchemaInconsistency(format!("{} slots exceed the record number range", slots))
            })?;

            f.seek(SeekFrom::Start(layout.data_offset()))
                .map_err(|e| StoreError::io("seek to data", e))?;
            let mut reader = BufReader::new(f);
            let mut slot = vec![0u8; layout.slot_size() as usize];
            let mut free = BTreeSet::new();

            for record_number in 0..record_count {
                reader.read_exact(&mut slot).map_err(|e| {
                    StoreError::io(format!("scan slot {}", record_number), e)
                })?;
                if DeletionFlag::from_byte(record_number, slot[0])?.is_deleted() {
                    free.insert(record_number);
                }
            }

            Ok((record_count, free))
        })
    }

    /// Writes a new database file with no records, then opens it.
    ///
    /// Refuses to overwrite an existing file.
    pub fn create_file(path: &Path, config: StoreConfig, schema: &Schema) -> StoreResult<Self> {
        config.validate_against(schema)?;

        {
            let file = DataFile::create_new(path)?;
            let written = file.access(|f| {
                let data_offset = schema::write_header(f, config.magic_cookie, config.charset, schema)?;
                f.sync_all()
                    .map_err(|e| StoreError::io("sync header", e))?;
                Ok::<_, StoreError>(data_offset)
            });
            if let Err(e) = written {
                let _ = fs::remove_file(path);
                return Err(e);
            }
        }

        observability::log_event(
            Event::StoreCreated,
            &[("path", path.display().to_string().as_str()), ("fields", schema.field_count().to_string().as_str())],
        );

        Self::open(path, config)
    }

    fn allocator(&self) -> MutexGuard<'_, SlotAllocator> {
        self.allocator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maps an I/O failure on a slot: end of file means the record is absent.
    fn slot_error(record_number: u32, e: io::Error) -> StoreError {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            StoreError::RecordNotFound(record_number)
        } else {
            StoreError::io(format!("access record {}", record_number), e)
        }
    }

    // ==================== Accessors ====================

    pub fn schema(&self) -> &Schema {
        self.codec.schema()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Slots in the file, including deleted ones
    pub fn record_count(&self) -> u32 {
        self.allocator().record_count()
    }

    /// Reusable slot numbers in ascending order
    pub fn free_slots(&self) -> Vec<u32> {
        self.allocator().free_slots()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Records currently locked
    pub fn outstanding_locks(&self) -> usize {
        self.locks.held_count()
    }

    pub fn is_locked(&self, record_number: u32) -> bool {
        self.locks.is_locked(record_number)
    }

    /// Copy of `fields` with every non-key field cleared.
    pub fn key_projection<S: AsRef<str>>(&self, fields: &[S]) -> StoreResult<Vec<Option<String>>> {
        self.codec.check_count(fields.len())?;
        let mut projection = vec![None; fields.len()];
        for &index in &self.config.key_fields {
            projection[index] = Some(fields[index].as_ref().to_string());
        }
        Ok(projection)
    }

    // ==================== Operations ====================

    /// Whether the slot exists and is live.
    fn exists(&self, record_number: u32) -> StoreResult<bool> {
        let position = self.layout.position_of(record_number);
        let mut flag = [0u8; 1];
        match self.file.read_at(position, &mut flag) {
            Ok(()) => Ok(!DeletionFlag::from_byte(record_number, flag[0])?.is_deleted()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(StoreError::io(format!("probe record {}", record_number), e)),
        }
    }

    /// Inserts a record, reusing the smallest deleted slot if there is one.
    ///
    /// # Errors
    ///
    /// - `DuplicateKey` if a live record matches the key projection of `fields`
    /// - `FieldTooLong`, `UnencodableField`, `FieldCountMismatch` for bad values
    pub fn create<S: AsRef<str>>(&self, fields: &[S]) -> StoreResult<u32> {
        let slot = self.codec.encode_slot(fields)?;
        let projection = self.key_projection(fields)?;

        let _serial = self
            .create_serial
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(&existing) = self.find(&projection)?.first() {
            return Err(StoreError::DuplicateKey(existing));
        }

        let allocation = self.allocator().next_free_slot();
        let record_number = allocation.record_number;
        let position = self.layout.position_of(record_number);

        let tombstone = self.codec.deleted_slot();
        let written = self.file.access(|f| {
            write_all_at(f, position, &slot)
                .map_err(|e| (e, restore_slot(f, allocation, position, &tombstone)))
        });

        if let Err((e, restored)) = written {
            match restored {
                Ok(()) => self.allocator().abandon(allocation),
                // neither free nor live: the slot stays out of circulation
                Err(restore_err) => observability::warn_event(
                    Event::SlotRestoreFailed,
                    &[
                        ("record", record_number.to_string().as_str()),
                        ("reason", restore_err.to_string().as_str()),
                    ],
                ),
            }
            return Err(StoreError::io(format!("write record {}", record_number), e));
        }

        self.metrics.increment_creates();
        if allocation.reused {
            self.metrics.increment_slots_reused();
        }
        observability::trace_event(
            Event::RecordCreated,
            &[
                ("record", record_number.to_string().as_str()),
                ("reused", if allocation.reused { "true" } else { "false" }),
            ],
        );

        Ok(record_number)
    }

    /// Returns a copy of the record's fields.
    ///
    /// Fails with `RecordNotFound` for deleted slots and numbers past end of file.
    pub fn read(&self, record_number: u32) -> StoreResult<Vec<String>> {
        let position = self.layout.position_of(record_number);
        let mut slot = vec![0u8; self.layout.slot_size() as usize];
        self.file
            .read_at(position, &mut slot)
            .map_err(|e| Self::slot_error(record_number, e))?;

        self.metrics.increment_reads();

        let record = self.codec.decode_slot(record_number, &slot)?;
        if record.deleted {
            return Err(StoreError::RecordNotFound(record_number));
        }
        Ok(record.fields)
    }

    fn check_token(&self, record_number: u32, token: LockToken) -> StoreResult<()> {
        if self.locks.validate(record_number, token) {
            Ok(())
        } else {
            self.metrics.increment_rejected_tokens();
            Err(StoreError::SecurityViolation(record_number))
        }
    }

    /// Reads the flag of a slot inside a file-access critical section and
    /// fails unless the record is live.
    fn require_live(file: &mut fs::File, record_number: u32, position: u64) -> StoreResult<()> {
        let mut flag = [0u8; 1];
        read_exact_at(file, position, &mut flag).map_err(|e| Self::slot_error(record_number, e))?;
        if DeletionFlag::from_byte(record_number, flag[0])?.is_deleted() {
            return Err(StoreError::RecordNotFound(record_number));
        }
        Ok(())
    }

    /// Overwrites the payload of a locked record in place.
    ///
    /// # Errors
    ///
    /// - `SecurityViolation` if `token` does not hold the record's lock
    /// - `RecordNotFound` if the slot is deleted or past end of file
    pub fn update<S: AsRef<str>>(
        &self,
        record_number: u32,
        fields: &[S],
        token: LockToken,
    ) -> StoreResult<()> {
        self.check_token(record_number, token)?;
        let payload = self.codec.encode(fields)?;
        let position = self.layout.position_of(record_number);

        self.file.access(|f| {
            Self::require_live(f, record_number, position)?;
            write_all_at(f, position + 1, &payload)
                .map_err(|e| Self::slot_error(record_number, e))
        })?;

        self.metrics.increment_updates();
        trace_record(Event::RecordUpdated, record_number);
        Ok(())
    }

    /// Flags a locked record deleted, zeroes its payload and frees its slot.
    ///
    /// The lock stays held; the caller still unlocks it. Until then the slot
    /// can be reused by `create`, and `token` also authorizes `update` and
    /// `delete` of the record placed there.
    ///
    /// # Errors
    ///
    /// - `SecurityViolation` if `token` does not hold the record's lock
    /// - `RecordNotFound` if the slot is already deleted or past end of file
    pub fn delete(&self, record_number: u32, token: LockToken) -> StoreResult<()> {
        self.check_token(record_number, token)?;
        let position = self.layout.position_of(record_number);
        let tombstone = self.codec.deleted_slot();

        self.file.access(|f| {
            Self::require_live(f, record_number, position)?;
            write_all_at(f, position, &tombstone).map_err(|e| Self::slot_error(record_number, e))
        })?;

        self.allocator().release(record_number);

        self.metrics.increment_deletes();
        trace_record(Event::RecordDeleted, record_number);
        Ok(())
    }

    /// Record numbers of live records matching `criteria`, ascending.
    ///
    /// A `Some(prefix)` criterion matches fields starting with `prefix`
    /// (case-sensitive); `None` matches anything. Slots with a corrupt flag are
    /// skipped.
    ///
    /// # Errors
    ///
    /// - `FieldCountMismatch` if `criteria` does not have one entry per field
    /// - `ScanFailed` if reading a slot fails for any reason but end of file
    pub fn find<S: AsRef<str>>(&self, criteria: &[Option<S>]) -> StoreResult<Vec<u32>> {
        self.codec.check_count(criteria.len())?;
        self.metrics.increment_finds();

        let record_count = self.record_count();
        let mut slot = vec![0u8; self.layout.slot_size() as usize];
        let mut matches = Vec::new();

        for record_number in 0..record_count {
            let position = self.layout.position_of(record_number);
            match self.file.read_at(position, &mut slot) {
                Ok(()) => {}
                // an appended slot whose write has not landed yet
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    observability::warn_event(
                        Event::ScanFailed,
                        &[("record", record_number.to_string().as_str()), ("reason", e.to_string().as_str())],
                    );
                    return Err(StoreError::ScanFailed {
                        record_number,
                        source: e,
                    });
                }
            }

            let record = match self.codec.decode_slot(record_number, &slot) {
                Ok(record) => record,
                Err(e) => {
                    observability::warn_event(
                        Event::CorruptSlotSkipped,
                        &[("record", record_number.to_string().as_str()), ("reason", e.to_string().as_str())],
                    );
                    continue;
                }
            };

            if !record.deleted && matches_criteria(&record.fields, criteria) {
                matches.push(record_number);
            }
        }

        Ok(matches)
    }

    /// Locks a live record, blocking while another caller holds it.
    ///
    /// Existence is checked again once the lock is granted; a record deleted
    /// while this caller waited yields `RecordNotFound` and no lock.
    pub fn lock(&self, record_number: u32) -> StoreResult<LockToken> {
        if !self.exists(record_number)? {
            return Err(StoreError::RecordNotFound(record_number));
        }
        let grant = self.locks.acquire(record_number);
        self.confirm_grant(record_number, grant)
    }

    /// Like `lock`, but gives up with `LockTimeout` after `timeout`.
    pub fn lock_timeout(&self, record_number: u32, timeout: Duration) -> StoreResult<LockToken> {
        let deadline = Instant::now() + timeout;
        if !self.exists(record_number)? {
            return Err(StoreError::RecordNotFound(record_number));
        }
        match self.locks.acquire_before(record_number, deadline) {
            Ok(grant) => self.confirm_grant(record_number, grant),
            Err(e) => {
                self.metrics.increment_lock_timeouts();
                trace_record(Event::LockTimeout, record_number);
                Err(e)
            }
        }
    }

    fn confirm_grant(&self, record_number: u32, grant: Grant) -> StoreResult<LockToken> {
        let live = self.exists(record_number);
        if !matches!(live, Ok(true)) {
            self.locks.release(record_number, grant.token)?;
            return Err(live.err().unwrap_or(StoreError::RecordNotFound(record_number)));
        }

        self.metrics.increment_lock_grants();
        if grant.waited {
            self.metrics.increment_lock_waits();
            trace_record(Event::LockWait, record_number);
        }
        trace_record(Event::LockGranted, record_number);

        Ok(grant.token)
    }

    /// Releases a lock, waking one waiter.
    ///
    /// # Errors
    ///
    /// - `LockNotHeld` if the record is not locked
    /// - `SecurityViolation` if `token` is not the holder's
    pub fn unlock(&self, record_number: u32, token: LockToken) -> StoreResult<()> {
        if let Err(e) = self.locks.release(record_number, token) {
            if matches!(e, StoreError::SecurityViolation(_)) {
                self.metrics.increment_rejected_tokens();
            }
            return Err(e);
        }
        trace_record(Event::LockReleased, record_number);
        Ok(())
    }
}

impl Drop for RecordStore {
    fn drop(&mut self) {
        let held = self.locks.held_count();
        if held > 0 {
            observability::Logger::warn(
                "STORE_CLOSED_WITH_LOCKS",
                &[("path", self.file.path().display().to_string().as_str()), ("locks", held.to_string().as_str())],
            );
        }
    }
}

/// Undoes a failed slot write inside the same file-access critical section:
/// a reused slot is flagged deleted again, an appended slot is cut off.
fn restore_slot(
    file: &mut fs::File,
    allocation: Allocation,
    position: u64,
    tombstone: &[u8],
) -> io::Result<()> {
    if allocation.reused {
        write_all_at(file, position, tombstone)
    } else {
        file.set_len(position)?;
        file.sync_data()
    }
}

fn trace_record(event: Event, record_number: u32) {
    observability::trace_event(event, &[("record", record_number.to_string().as_str())]);
}

/// Prefix match of every non-null criterion against the same field.
pub fn matches_criteria<S: AsRef<str>>(fields: &[String], criteria: &[Option<S>]) -> bool {
    fields
        .iter()
        .zip(criteria)
        .all(|(field, criterion)| match criterion {
            Some(prefix) => field.starts_with(prefix.as_ref()),
            None => true,
        })
}
