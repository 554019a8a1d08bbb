//! Aggregate roots for the Place Registry.

use chrono::{DateTime, Utc};
use roomly_core::aggregate::AggregateRoot;
use roomly_core::clock::Clock;
use roomly_core::error::DomainError;
use roomly_core::event::EventMetadata;
use uuid::Uuid;

use super::events::{
    BOOKING_ATTACHED_EVENT_TYPE, BookingAttached, PLACE_CREATED_EVENT_TYPE,
    PLACE_DELETED_EVENT_TYPE, PLACE_UPDATED_EVENT_TYPE, PlaceCreated, PlaceDeleted, PlaceEvent,
    PlaceEventKind, PlaceUpdated,
};
use super::values::PlaceDetails;

/// Lifecycle of a place stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceState {
    /// No `place.created` event yet.
    Unlisted,
    /// Listed and bookable.
    Listed,
    /// Deleted by its owner.
    Deleted,
}

/// The aggregate root for a bookable place.
#[derive(Debug)]
pub struct Place {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    pub(crate) state: PlaceState,
    pub(crate) owner_id: Option<Uuid>,
    pub(crate) details: Option<PlaceDetails>,
    /// Bookings referencing this place, in request order.
    pub(crate) booking_ids: Vec<Uuid>,
    pub(crate) created_at: Option<DateTime<Utc>>,
    pub(crate) updated_at: Option<DateTime<Utc>>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<PlaceEvent>,
}

impl Place {
    /// Creates an empty place stream.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            state: PlaceState::Unlisted,
            owner_id: None,
            details: None,
            booking_ids: Vec::new(),
            created_at: None,
            updated_at: None,
            uncommitted_events: Vec::new(),
        }
    }

    /// Whether the place is listed (created and not deleted).
    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.state == PlaceState::Listed
    }

    /// The owning host, once listed.
    #[must_use]
    pub fn owner_id(&self) -> Option<Uuid> {
        self.owner_id
    }

    /// Current fields, once listed.
    #[must_use]
    pub fn details(&self) -> Option<&PlaceDetails> {
        self.details.as_ref()
    }

    /// Bookings attached to the place.
    #[must_use]
    pub fn booking_ids(&self) -> &[Uuid] {
        &self.booking_ids
    }

    /// When the place was listed.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// When the place last changed.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn emit(
        &mut self,
        event_type: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
        kind: PlaceEventKind,
    ) {
        let metadata = EventMetadata::new(
            event_type,
            self.id,
            self.next_sequence_number(),
            correlation_id,
            clock.now(),
        );
        self.uncommitted_events.push(PlaceEvent { metadata, kind });
    }

    fn ensure_listed(&self) -> Result<(), DomainError> {
        if self.is_listed() {
            Ok(())
        } else {
            Err(DomainError::NotFound {
                entity: "place",
                id: self.id,
            })
        }
    }

    /// Lists the place under `owner_id`, producing a `PlaceCreated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the stream already holds a place.
    pub fn create(
        &mut self,
        owner_id: Uuid,
        details: PlaceDetails,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.state != PlaceState::Unlisted || !self.uncommitted_events.is_empty() {
            return Err(DomainError::validation("id", "place already exists"));
        }
        let kind = PlaceEventKind::PlaceCreated(PlaceCreated {
            place_id: self.id,
            owner_id,
            details,
        });
        self.emit(PLACE_CREATED_EVENT_TYPE, correlation_id, clock, kind);
        Ok(())
    }

    /// Replaces every mutable field, producing a `PlaceUpdated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the place is not listed.
    pub fn update(
        &mut self,
        details: PlaceDetails,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_listed()?;
        let kind = PlaceEventKind::PlaceUpdated(PlaceUpdated {
            place_id: self.id,
            details,
        });
        self.emit(PLACE_UPDATED_EVENT_TYPE, correlation_id, clock, kind);
        Ok(())
    }

    /// Records that `booking_id` references this place.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the place is not listed.
    pub fn attach_booking(
        &mut self,
        booking_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_listed()?;
        let kind = PlaceEventKind::BookingAttached(BookingAttached {
            place_id: self.id,
            booking_id,
        });
        self.emit(BOOKING_ATTACHED_EVENT_TYPE, correlation_id, clock, kind);
        Ok(())
    }

    /// Deletes the place, producing a `PlaceDeleted` event that names the
    /// bookings removed alongside it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the place is not listed, which
    /// includes a place that was already deleted.
    pub fn delete(
        &mut self,
        removed_bookings: Vec<Uuid>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_listed()?;
        let kind = PlaceEventKind::PlaceDeleted(PlaceDeleted {
            place_id: self.id,
            removed_bookings,
        });
        self.emit(PLACE_DELETED_EVENT_TYPE, correlation_id, clock, kind);
        Ok(())
    }
}

impl AggregateRoot for Place {
    type Event = PlaceEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        let at = event.metadata.occurred_at;
        match &event.kind {
            PlaceEventKind::PlaceCreated(payload) => {
                self.state = PlaceState::Listed;
                self.owner_id = Some(payload.owner_id);
                self.details = Some(payload.details.clone());
                self.created_at = Some(at);
                self.updated_at = Some(at);
            }
            PlaceEventKind::PlaceUpdated(payload) => {
                self.details = Some(payload.details.clone());
                self.updated_at = Some(at);
            }
            PlaceEventKind::BookingAttached(payload) => {
                self.booking_ids.push(payload.booking_id);
            }
            PlaceEventKind::PlaceDeleted(_) => {
                self.state = PlaceState::Deleted;
                self.booking_ids.clear();
                self.updated_at = Some(at);
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
