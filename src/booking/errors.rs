//! Booking errors

use thiserror::Error;

use crate::error::StoreError;

/// Result type for booking operations
pub type BookingResult<T> = Result<T, BookingError>;

/// Booking workflow error
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("no record matches the key")]
    RecordNotFound,

    #[error("record {0} is already booked")]
    AlreadyBooked(u32),

    #[error("record {0} is not booked")]
    NotBooked(u32),

    #[error("no availability field configured")]
    NoAvailabilityField,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::RecordNotFound => "SLOT_RECORD_NOT_FOUND",
            BookingError::AlreadyBooked(_) => "BOOKING_ALREADY_BOOKED",
            BookingError::NotBooked(_) => "BOOKING_NOT_BOOKED",
            BookingError::NoAvailabilityField => "BOOKING_NO_AVAILABILITY_FIELD",
            BookingError::Store(e) => e.code(),
        }
    }
}
