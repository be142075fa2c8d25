//! Booking workflow
//!
//! Reservation semantics layered on the record store: a record is booked
//! by writing a customer identifier into its availability field under the
//! record's lock.

mod errors;
mod service;

pub use errors::{BookingError, BookingResult};
pub use service::{is_available, BookingService};
