//! Book and release records
//!
//! A record is available when its availability field is blank. Booking
//! writes a customer identifier into that field; releasing blanks it again.
//! Both follow the same sequence against the store:
//!
//! ```text
//! lock -> read -> check availability -> update -> unlock
//! ```
//!
//! The unlock runs whether or not the steps in between succeed.

use crate::error::StoreError;
use crate::lock::LockToken;
use crate::observability::{self, Event};
use crate::store::RecordAccess;

use super::errors::{BookingError, BookingResult};

/// Whether an availability value marks the record free
pub fn is_available(value: &str) -> bool {
    value.trim().is_empty()
}

/// Booking workflow over any record store
#[derive(Debug)]
pub struct BookingService<S> {
    store: S,
    availability_field: usize,
}

impl<S: RecordAccess> BookingService<S> {
    /// Uses the availability field named in the store's configuration.
    pub fn new(store: S) -> BookingResult<Self> {
        let availability_field = store
            .config()
            .availability_field
            .ok_or(BookingError::NoAvailabilityField)?;
        Ok(Self {
            store,
            availability_field,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn availability_field(&self) -> usize {
        self.availability_field
    }

    /// Finds the single live record whose key fields match `fields`.
    ///
    /// # Errors
    ///
    /// - `RecordNotFound` if nothing matches
    /// - `DuplicateKey` if more than one record matches, which means the
    ///   file holds inconsistent data
    pub fn locate(&self, fields: &[String]) -> BookingResult<u32> {
        let projection = self.store.key_projection(fields)?;
        let matches = self.store.find(&projection)?;
        match matches.as_slice() {
            [] => Err(BookingError::RecordNotFound),
            [record_number] => Ok(*record_number),
            [first, ..] => Err(StoreError::DuplicateKey(*first).into()),
        }
    }

    /// Writes `customer` into an available record. Returns the new fields.
    pub fn book(&self, record_number: u32, customer: &str) -> BookingResult<Vec<String>> {
        self.transition(record_number, customer, |available| {
            if available {
                Ok(())
            } else {
                Err(BookingError::AlreadyBooked(record_number))
            }
        })
    }

    /// Blanks the availability field of a booked record. Returns the new fields.
    pub fn release(&self, record_number: u32) -> BookingResult<Vec<String>> {
        self.transition(record_number, "", |available| {
            if available {
                Err(BookingError::NotBooked(record_number))
            } else {
                Ok(())
            }
        })
    }

    fn transition(
        &self,
        record_number: u32,
        value: &str,
        check: impl FnOnce(bool) -> BookingResult<()>,
    ) -> BookingResult<Vec<String>> {
        let token = self.store.lock(record_number)?;
        let outcome = self.apply(record_number, token, value, check);
        let unlocked = self.store.unlock(record_number, token);

        let record = record_number.to_string();
        match &outcome {
            Ok(_) => observability::log_event(
                Event::BookingCommitted,
                &[("record", record.as_str()), ("value", value)],
            ),
            Err(e) => observability::warn_event(
                Event::BookingRejected,
                &[("record", record.as_str()), ("code", e.code())],
            ),
        }

        let fields = outcome?;
        unlocked?;
        Ok(fields)
    }

    fn apply(
        &self,
        record_number: u32,
        token: LockToken,
        value: &str,
        check: impl FnOnce(bool) -> BookingResult<()>,
    ) -> BookingResult<Vec<String>> {
        let mut fields = self.store.read(record_number)?;
        let current = fields
            .get(self.availability_field)
            .map(String::as_str)
            .unwrap_or_default();
        check(is_available(current))?;

        if let Some(slot) = fields.get_mut(self.availability_field) {
            *slot = value.to_string();
        }
        self.store.update(record_number, &fields, token)?;
        Ok(fields)
    }
}
