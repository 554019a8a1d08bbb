//! Aggregate roots for the Booking Ledger.

use chrono::{DateTime, Utc};
use roomly_access::Grant;
use roomly_core::aggregate::AggregateRoot;
use roomly_core::clock::Clock;
use roomly_core::error::DomainError;
use roomly_core::event::EventMetadata;
use uuid::Uuid;

use super::events::{
    BOOKING_APPROVED_EVENT_TYPE, BOOKING_CANCELLED_EVENT_TYPE, BOOKING_REJECTED_EVENT_TYPE,
    BOOKING_REMOVED_EVENT_TYPE, BOOKING_REQUESTED_EVENT_TYPE, BookingApproved, BookingCancelled,
    BookingEvent, BookingEventKind, BookingRejected, BookingRemoved, BookingRequested,
};
use super::values::{BookingDetails, BookingStatus, Resolution};

/// The aggregate root for a booking request.
#[derive(Debug)]
pub struct Booking {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    pub(crate) place_id: Option<Uuid>,
    pub(crate) requester_id: Option<Uuid>,
    pub(crate) details: Option<BookingDetails>,
    pub(crate) status: BookingStatus,
    pub(crate) resolution: Option<Resolution>,
    pub(crate) decided_by: Option<Uuid>,
    pub(crate) requested_at: Option<DateTime<Utc>>,
    pub(crate) decided_at: Option<DateTime<Utc>>,
    pub(crate) removed: bool,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<BookingEvent>,
}

impl Booking {
    /// Creates an empty booking stream.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            place_id: None,
            requester_id: None,
            details: None,
            status: BookingStatus::Pending,
            resolution: None,
            decided_by: None,
            requested_at: None,
            decided_at: None,
            removed: false,
            uncommitted_events: Vec::new(),
        }
    }

    /// Whether the booking exists and has not been removed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.requested_at.is_some() && !self.removed
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> BookingStatus {
        self.status
    }

    /// The booked place.
    #[must_use]
    pub fn place_id(&self) -> Option<Uuid> {
        self.place_id
    }

    /// The requesting user.
    #[must_use]
    pub fn requester_id(&self) -> Option<Uuid> {
        self.requester_id
    }

    /// Validated booking fields.
    #[must_use]
    pub fn details(&self) -> Option<&BookingDetails> {
        self.details.as_ref()
    }

    /// How the booking left `pending`, if it has.
    #[must_use]
    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    /// Who resolved the booking.
    #[must_use]
    pub fn decided_by(&self) -> Option<Uuid> {
        self.decided_by
    }

    /// When the booking was requested.
    #[must_use]
    pub fn requested_at(&self) -> Option<DateTime<Utc>> {
        self.requested_at
    }

    /// When the booking was resolved.
    #[must_use]
    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
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
        kind: BookingEventKind,
    ) {
        let metadata = EventMetadata::new(
            event_type,
            self.id,
            self.next_sequence_number(),
            correlation_id,
            clock.now(),
        );
        self.uncommitted_events.push(BookingEvent { metadata, kind });
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(DomainError::NotFound {
                entity: "booking",
                id: self.id,
            })
        }
    }

    /// Records a new request in `pending` status.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the stream already holds a
    /// booking.
    pub fn request(
        &mut self,
        place_id: Uuid,
        requester_id: Uuid,
        details: BookingDetails,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.version > 0 || !self.uncommitted_events.is_empty() {
            return Err(DomainError::validation("id", "booking already exists"));
        }
        let kind = BookingEventKind::BookingRequested(BookingRequested {
            booking_id: self.id,
            place_id,
            requester_id,
            details,
        });
        self.emit(BOOKING_REQUESTED_EVENT_TYPE, correlation_id, clock, kind);
        Ok(())
    }

    /// Applies the status state machine.
    ///
    /// Only `pending` bookings move, and only to `approved` or `rejected`. A
    /// rejection granted to the requester is recorded as a cancellation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the booking was removed and
    /// `DomainError::InvalidTransition` if the move is not an edge of the
    /// state machine.
    pub fn decide(
        &mut self,
        target: BookingStatus,
        grant: Grant,
        actor_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        if self.status != BookingStatus::Pending || target == BookingStatus::Pending {
            return Err(DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        let booking_id = self.id;
        let (event_type, kind) = match (target, grant) {
            (BookingStatus::Approved, _) => (
                BOOKING_APPROVED_EVENT_TYPE,
                BookingEventKind::BookingApproved(BookingApproved {
                    booking_id,
                    decided_by: actor_id,
                }),
            ),
            (_, Grant::Requester) => (
                BOOKING_CANCELLED_EVENT_TYPE,
                BookingEventKind::BookingCancelled(BookingCancelled {
                    booking_id,
                    decided_by: actor_id,
                }),
            ),
            _ => (
                BOOKING_REJECTED_EVENT_TYPE,
                BookingEventKind::BookingRejected(BookingRejected {
                    booking_id,
                    decided_by: actor_id,
                }),
            ),
        };
        self.emit(event_type, correlation_id, clock, kind);
        Ok(())
    }

    /// Removes the booking as part of deleting its place.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the booking is not active.
    pub fn remove(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_active()?;
        let place_id = self.place_id.ok_or(DomainError::NotFound {
            entity: "booking",
            id: self.id,
        })?;
        let kind = BookingEventKind::BookingRemoved(BookingRemoved {
            booking_id: self.id,
            place_id,
        });
        self.emit(BOOKING_REMOVED_EVENT_TYPE, correlation_id, clock, kind);
        Ok(())
    }

    fn resolve(
        &mut self,
        status: BookingStatus,
        resolution: Resolution,
        by: Uuid,
        at: DateTime<Utc>,
    ) {
        self.status = status;
        self.resolution = Some(resolution);
        self.decided_by = Some(by);
        self.decided_at = Some(at);
    }
}

impl AggregateRoot for Booking {
    type Event = BookingEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        let at = event.metadata.occurred_at;
        match &event.kind {
            BookingEventKind::BookingRequested(payload) => {
                self.place_id = Some(payload.place_id);
                self.requester_id = Some(payload.requester_id);
                self.details = Some(payload.details.clone());
                self.status = BookingStatus::Pending;
                self.requested_at = Some(at);
            }
            BookingEventKind::BookingApproved(payload) => {
                self.resolve(BookingStatus::Approved, Resolution::Approved, payload.decided_by, at);
            }
            BookingEventKind::BookingRejected(payload) => {
                self.resolve(BookingStatus::Rejected, Resolution::Rejected, payload.decided_by, at);
            }
            BookingEventKind::BookingCancelled(payload) => {
                self.resolve(BookingStatus::Rejected, Resolution::Cancelled, payload.decided_by, at);
            }
            BookingEventKind::BookingRemoved(_) => {
                self.removed = true;
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
