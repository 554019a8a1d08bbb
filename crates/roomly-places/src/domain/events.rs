//! Domain events for the Place Registry.

use roomly_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::values::PlaceDetails;

/// Emitted when a host lists a place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceCreated {
    /// The place identifier.
    pub place_id: Uuid,
    /// The owning host.
    pub owner_id: Uuid,
    /// Initial fields.
    pub details: PlaceDetails,
}

/// Emitted when the owner replaces the place's fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceUpdated {
    /// The place identifier.
    pub place_id: Uuid,
    /// Replacement fields.
    pub details: PlaceDetails,
}

/// Emitted when a booking is requested against the place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingAttached {
    /// The place identifier.
    pub place_id: Uuid,
    /// The new booking.
    pub booking_id: Uuid,
}

/// Emitted when the owner deletes the place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceDeleted {
    /// The place identifier.
    pub place_id: Uuid,
    /// Bookings removed together with the place.
    pub removed_bookings: Vec<Uuid>,
}

/// Event type identifier for [`PlaceCreated`].
pub const PLACE_CREATED_EVENT_TYPE: &str = "place.created";

/// Event type identifier for [`PlaceUpdated`].
pub const PLACE_UPDATED_EVENT_TYPE: &str = "place.updated";

/// Event type identifier for [`BookingAttached`].
pub const BOOKING_ATTACHED_EVENT_TYPE: &str = "place.booking_attached";

/// Event type identifier for [`PlaceDeleted`].
pub const PLACE_DELETED_EVENT_TYPE: &str = "place.deleted";

/// Category shared by every place event type.
pub const PLACE_EVENT_CATEGORY: &str = "place";

/// Event payload variants for the Place Registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlaceEventKind {
    /// A place has been listed.
    PlaceCreated(PlaceCreated),
    /// A place's fields have been replaced.
    PlaceUpdated(PlaceUpdated),
    /// A booking now references the place.
    BookingAttached(BookingAttached),
    /// A place has been deleted.
    PlaceDeleted(PlaceDeleted),
}

/// Domain event envelope for the Place Registry.
#[derive(Debug, Clone)]
pub struct PlaceEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: PlaceEventKind,
}

impl DomainEvent for PlaceEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            PlaceEventKind::PlaceCreated(_) => PLACE_CREATED_EVENT_TYPE,
            PlaceEventKind::PlaceUpdated(_) => PLACE_UPDATED_EVENT_TYPE,
            PlaceEventKind::BookingAttached(_) => BOOKING_ATTACHED_EVENT_TYPE,
            PlaceEventKind::PlaceDeleted(_) => PLACE_DELETED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind).unwrap_or(serde_json::Value::Null)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
