//! Observable store events

use std::fmt;

/// Events emitted by the store and the booking workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Store opened and ready
    StoreOpen,
    /// Header or schema check failed at open (FATAL)
    StoreOpenFailed,
    /// New database file written
    StoreCreated,

    // Record mutations
    RecordCreated,
    RecordUpdated,
    RecordDeleted,
    /// Failed create could not put its slot back; the slot is withheld
    SlotRestoreFailed,

    // Locking
    LockGranted,
    LockReleased,
    /// Caller blocked behind another holder
    LockWait,
    LockTimeout,

    // Scans
    /// Slot with an invalid deletion flag skipped during find
    CorruptSlotSkipped,
    /// I/O error ended a scan
    ScanFailed,

    // Booking
    BookingCommitted,
    BookingRejected,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreOpen => "STORE_OPEN",
            Event::StoreOpenFailed => "STORE_OPEN_FAILED",
            Event::StoreCreated => "STORE_CREATED",
            Event::RecordCreated => "RECORD_CREATED",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::RecordDeleted => "RECORD_DELETED",
            Event::SlotRestoreFailed => "SLOT_RESTORE_FAILED",
            Event::LockGranted => "LOCK_GRANTED",
            Event::LockReleased => "LOCK_RELEASED",
            Event::LockWait => "LOCK_WAIT",
            Event::LockTimeout => "LOCK_TIMEOUT",
            Event::CorruptSlotSkipped => "CORRUPT_SLOT_SKIPPED",
            Event::ScanFailed => "SCAN_FAILED",
            Event::BookingCommitted => "BOOKING_COMMITTED",
            Event::BookingRejected => "BOOKING_REJECTED",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StoreOpenFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
