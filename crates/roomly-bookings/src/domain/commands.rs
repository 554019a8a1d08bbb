//! Commands for the Booking Ledger.

use roomly_core::command::Command;
use uuid::Uuid;

use super::values::BookingDraft;

/// Command to request a booking on a place.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The place to book.
    pub place_id: Uuid,
    /// Submitted fields.
    pub draft: BookingDraft,
}

impl Command for CreateBooking {
    fn command_type(&self) -> &'static str {
        "bookings.create_booking"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to move a booking to another status.
#[derive(Debug, Clone)]
pub struct UpdateBookingStatus {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The booking to change.
    pub booking_id: Uuid,
    /// Requested status as submitted; parsed by the handler.
    pub status: String,
}

impl Command for UpdateBookingStatus {
    fn command_type(&self) -> &'static str {
        "bookings.update_booking_status"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
