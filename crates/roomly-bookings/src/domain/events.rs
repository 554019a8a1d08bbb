//! Domain events for the Booking Ledger.

use roomly_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::values::BookingDetails;

/// Emitted when a user requests a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequested {
    /// The booking identifier.
    pub booking_id: Uuid,
    /// The booked place.
    pub place_id: Uuid,
    /// The requesting user.
    pub requester_id: Uuid,
    /// Validated booking fields.
    pub details: BookingDetails,
}

/// Emitted when the host approves a pending booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingApproved {
    /// The booking identifier.
    pub booking_id: Uuid,
    /// The approving host.
    pub decided_by: Uuid,
}

/// Emitted when the host rejects a pending booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRejected {
    /// The booking identifier.
    pub booking_id: Uuid,
    /// The rejecting host.
    pub decided_by: Uuid,
}

/// Emitted when the requester cancels a pending booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCancelled {
    /// The booking identifier.
    pub booking_id: Uuid,
    /// The cancelling requester.
    pub decided_by: Uuid,
}

/// Emitted when the booking's place is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRemoved {
    /// The booking identifier.
    pub booking_id: Uuid,
    /// The deleted place.
    pub place_id: Uuid,
}

/// Event type identifier for [`BookingRequested`].
pub const BOOKING_REQUESTED_EVENT_TYPE: &str = "booking.requested";

/// Event type identifier for [`BookingApproved`].
pub const BOOKING_APPROVED_EVENT_TYPE: &str = "booking.approved";

/// Event type identifier for [`BookingRejected`].
pub const BOOKING_REJECTED_EVENT_TYPE: &str = "booking.rejected";

/// Event type identifier for [`BookingCancelled`].
pub const BOOKING_CANCELLED_EVENT_TYPE: &str = "booking.cancelled";

/// Event type identifier for [`BookingRemoved`].
pub const BOOKING_REMOVED_EVENT_TYPE: &str = "booking.removed";

/// Category shared by every booking event type.
pub const BOOKING_EVENT_CATEGORY: &str = "booking";

/// Event payload variants for the Booking Ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BookingEventKind {
    /// A booking has been requested.
    BookingRequested(BookingRequested),
    /// A booking has been approved.
    BookingApproved(BookingApproved),
    /// A booking has been rejected by the host.
    BookingRejected(BookingRejected),
    /// A booking has been cancelled by its requester.
    BookingCancelled(BookingCancelled),
    /// A booking has been removed with its place.
    BookingRemoved(BookingRemoved),
}

/// Domain event envelope for the Booking Ledger.
#[derive(Debug, Clone)]
pub struct BookingEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: BookingEventKind,
}

impl DomainEvent for BookingEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            BookingEventKind::BookingRequested(_) => BOOKING_REQUESTED_EVENT_TYPE,
            BookingEventKind::BookingApproved(_) => BOOKING_APPROVED_EVENT_TYPE,
            BookingEventKind::BookingRejected(_) => BOOKING_REJECTED_EVENT_TYPE,
            BookingEventKind::BookingCancelled(_) => BOOKING_CANCELLED_EVENT_TYPE,
            BookingEventKind::BookingRemoved(_) => BOOKING_REMOVED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind).unwrap_or(serde_json::Value::Null)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
