//! Command handlers for the Booking Ledger.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: load aggregates, authorize, execute command,
//! persist events.

use roomly_access::{Action, StatusChange, authorize, require_authenticated};
use roomly_core::aggregate::AggregateRoot;
use roomly_core::clock::Clock;
use roomly_core::command::Command;
use roomly_core::error::DomainError;
use roomly_core::event::{EventMetadata, category_of, decode_payload};
use roomly_core::identity::{Caller, UserDirectory};
use roomly_core::repository::{EventRepository, StoredEvent, StreamAppend};
use roomly_places::application::command_handlers::{load_place, owner_of};
use roomly_places::application::query_handlers::{PlaceSummary, PlaceView};
use roomly_places::domain::aggregates::Place;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::query_handlers::{BookingView, booking_parties, requester_info};
use crate::domain::aggregates::Booking;
use crate::domain::commands::{CreateBooking, UpdateBookingStatus};
use crate::domain::events::{BOOKING_EVENT_CATEGORY, BookingEvent, BookingEventKind};
use crate::domain::values::{BookingDetails, BookingStatus};

/// Result of a successful booking command.
#[derive(Debug)]
pub struct BookingCommandResult {
    /// The booking after the command.
    pub booking: BookingView,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Reconstitutes a `Booking` from stored events.
///
/// A stream belonging to another aggregate type yields a booking that was
/// never requested.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub fn reconstitute(
    booking_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<Booking, DomainError> {
    let mut booking = Booking::new(booking_id);
    if existing_events
        .iter()
        .any(|e| category_of(&e.event_type) != BOOKING_EVENT_CATEGORY)
    {
        return Ok(booking);
    }
    for stored in existing_events {
        let kind: BookingEventKind = decode_payload(stored)?;
        booking.apply(&BookingEvent {
            metadata: EventMetadata::from_stored(stored),
            kind,
        });
    }
    Ok(booking)
}

/// Loads an active booking.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the booking was never requested or has
/// been removed, and `DomainError::Infrastructure` if loading fails.
pub async fn load_booking(
    booking_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<Booking, DomainError> {
    let stored_events = repo.load_events(booking_id).await?;
    let booking = reconstitute(booking_id, &stored_events)?;
    if booking.is_active() {
        Ok(booking)
    } else {
        Err(DomainError::NotFound {
            entity: "booking",
            id: booking_id,
        })
    }
}

/// Handles the `CreateBooking` command.
///
/// The booking's `booking.requested` event and the place's
/// `place.booking_attached` event are written as one batch guarded by the
/// place's version, so a booking never lands on a place that a concurrent
/// delete has removed.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the place does not exist,
/// `DomainError::Authorization` for anonymous callers and for the place's
/// owner, `DomainError::Validation` for invalid fields,
/// `DomainError::ConcurrencyConflict` if the place changed concurrently, and
/// `DomainError::Infrastructure` if persistence fails.
pub async fn handle_create_booking(
    command: &CreateBooking,
    caller: &Caller,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<BookingCommandResult, DomainError> {
    let actor = require_authenticated(caller)?;
    let mut place = load_place(command.place_id, repo).await?;
    let place_owner_id = owner_of(&place)?;
    authorize(caller, &Action::CreateBooking { place_owner_id })?;

    let place_details = place.details().ok_or(DomainError::NotFound {
        entity: "place",
        id: command.place_id,
    })?;
    let details = BookingDetails::from_draft(&command.draft, place_details)?;

    let booking_id = Uuid::new_v4();
    let mut booking = Booking::new(booking_id);
    booking.request(
        command.place_id,
        actor.user_id,
        details,
        command.correlation_id,
        clock,
    )?;
    place.attach_booking(booking_id, command.correlation_id, clock)?;

    let batch = [
        StreamAppend::from_events(booking_id, booking.version(), booking.uncommitted_events()),
        StreamAppend::from_events(command.place_id, place.version(), place.uncommitted_events()),
    ];
    if let Err(err) = repo.append_batch(&batch).await {
        return Err(explain_place_conflict(err, command.place_id, repo).await);
    }
    booking.commit();
    place.commit();

    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        booking_id = %booking_id,
        place_id = %command.place_id,
        requester_id = %actor.user_id,
        "booking requested"
    );
    Ok(BookingCommandResult {
        booking: BookingView::build(&booking, summary_of(&place)?, None)?,
        stored_events: batch.into_iter().flat_map(|a| a.events).collect(),
    })
}

/// Handles the `UpdateBookingStatus` command.
///
/// Anonymous callers are refused before the target is parsed. The caller
/// is then authorized against the booking's place and requester, and
/// finally the state machine runs. When
/// the write loses a race the booking is reloaded so the caller learns why.
///
/// # Errors
///
/// Returns `DomainError::Authorization` for an anonymous caller or when the
/// caller may not make the change, `DomainError::Validation` for an unknown
/// target status,
/// `DomainError::NotFound` if the booking does not exist,
/// `DomainError::InvalidTransition` if the booking is no longer `pending`,
/// and `DomainError::Infrastructure` if persistence fails.
pub async fn handle_update_booking_status(
    command: &UpdateBookingStatus,
    caller: &Caller,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    users: &dyn UserDirectory,
) -> Result<BookingCommandResult, DomainError> {
    let actor = require_authenticated(caller)?;
    let target: BookingStatus = command.status.parse()?;
    let mut booking = load_booking(command.booking_id, repo).await?;
    let (place_id, requester_id) = booking_parties(&booking)?;
    let place = load_place(place_id, repo).await?;

    let change = match target {
        BookingStatus::Approved => StatusChange::Approve,
        BookingStatus::Rejected => StatusChange::Reject,
        BookingStatus::Pending => StatusChange::Reopen,
    };
    let grant = authorize(
        caller,
        &Action::ChangeBookingStatus {
            change,
            place_owner_id: owner_of(&place)?,
            requester_id,
        },
    )?;
    booking.decide(target, grant, actor.user_id, command.correlation_id, clock)?;

    let stored_events: Vec<StoredEvent> = booking
        .uncommitted_events()
        .iter()
        .map(StoredEvent::from_event)
        .collect();
    match repo
        .append_events(command.booking_id, booking.version(), &stored_events)
        .await
    {
        Ok(()) => {}
        Err(err @ DomainError::ConcurrencyConflict { .. }) => {
            warn!(
                correlation_id = %command.correlation_id,
                booking_id = %command.booking_id,
                target = %target,
                "booking status write lost a race"
            );
            return Err(explain_lost_race(err, command.booking_id, target, repo).await);
        }
        Err(other) => return Err(other),
    }
    booking.commit();

    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        booking_id = %command.booking_id,
        status = %target,
        resolution = ?booking.resolution(),
        "booking status changed"
    );
    let requester = requester_info(users, Some(requester_id)).await?;
    Ok(BookingCommandResult {
        booking: BookingView::build(&booking, summary_of(&place)?, requester)?,
        stored_events,
    })
}

/// Turns a failed booking batch into the error the caller should see: a
/// place deleted in the meantime is `NotFound`.
async fn explain_place_conflict(
    err: DomainError,
    place_id: Uuid,
    repo: &dyn EventRepository,
) -> DomainError {
    if let DomainError::ConcurrencyConflict { aggregate_id, .. } = &err {
        if *aggregate_id == place_id {
            if let Err(reload_err) = load_place(place_id, repo).await {
                return reload_err;
            }
        }
    }
    err
}

/// Reloads a booking whose status write conflicted and reports what beat
/// it: a decision (`InvalidTransition`) or a cascade (`NotFound`).
async fn explain_lost_race(
    conflict: DomainError,
    booking_id: Uuid,
    target: BookingStatus,
    repo: &dyn EventRepository,
) -> DomainError {
    match load_booking(booking_id, repo).await {
        Ok(current) if current.status() != BookingStatus::Pending => {
            DomainError::InvalidTransition {
                from: current.status().to_string(),
                to: target.to_string(),
            }
        }
        Ok(_) => conflict,
        Err(reload_err) => reload_err,
    }
}

fn summary_of(place: &Place) -> Result<PlaceSummary, DomainError> {
    Ok(PlaceSummary::from(&PlaceView::from_place(place)?))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use roomly_core::error::DomainError;
    use roomly_core::identity::{Actor, Caller, Role};
    use roomly_core::repository::{EventRepository, StoredEvent, StreamAppend};
    use roomly_places::application::command_handlers::{handle_create_place, load_place};
    use roomly_places::domain::commands::CreatePlace;
    use roomly_places::domain::values::PlaceDraft;
    use roomly_test_support::{
        FailingEventRepository, FixedClock, InMemoryEventRepository, StaticUserDirectory, fixed_now,
    };
    use uuid::Uuid;

    use super::{handle_create_booking, handle_update_booking_status, load_booking};
    use crate::domain::commands::{CreateBooking, UpdateBookingStatus};
    use crate::domain::values::{BookingDraft, BookingStatus, Resolution};

    /// Yields to the scheduler after every load so concurrent handlers
    /// interleave between reading a stream and writing it.
    struct YieldingRepository {
        inner: Arc<InMemoryEventRepository>,
    }

    #[async_trait]
    impl EventRepository for YieldingRepository {
        async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
            let events = self.inner.load_events(aggregate_id).await;
            tokio::task::yield_now().await;
            events
        }

        async fn append_events(
            &self,
            aggregate_id: Uuid,
            expected_version: i64,
            events: &[StoredEvent],
        ) -> Result<(), DomainError> {
            self.inner
                .append_events(aggregate_id, expected_version, events)
                .await
        }

        async fn append_batch(&self, batch: &[StreamAppend]) -> Result<(), DomainError> {
            self.inner.append_batch(batch).await
        }

        async fn load_category(&self, category: &str) -> Result<Vec<StoredEvent>, DomainError> {
            self.inner.load_category(category).await
        }
    }

    /// Serves one stale snapshot of a stream, then delegates.
    struct StaleOnceRepository {
        inner: Arc<InMemoryEventRepository>,
        stale: Mutex<Option<(Uuid, Vec<StoredEvent>)>>,
    }

    #[async_trait]
    impl EventRepository for StaleOnceRepository {
        async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
            let snapshot = {
                let mut stale = self.stale.lock().unwrap();
                match stale.take() {
                    Some((id, events)) if id == aggregate_id => Some(events),
                    other => {
                        *stale = other;
                        None
                    }
                }
            };
            match snapshot {
                Some(events) => Ok(events),
                None => self.inner.load_events(aggregate_id).await,
            }
        }

        async fn append_events(
            &self,
            aggregate_id: Uuid,
            expected_version: i64,
            events: &[StoredEvent],
        ) -> Result<(), DomainError> {
            self.inner
                .append_events(aggregate_id, expected_version, events)
                .await
        }

        async fn append_batch(&self, batch: &[StreamAppend]) -> Result<(), DomainError> {
            self.inner.append_batch(batch).await
        }

        async fn load_category(&self, category: &str) -> Result<Vec<StoredEvent>, DomainError> {
            self.inner.load_category(category).await
        }
    }

    struct Fixture {
        repo: Arc<InMemoryEventRepository>,
        users: StaticUserDirectory,
        clock: FixedClock,
        host: Actor,
        client: Actor,
        place_id: Uuid,
    }

    impl Fixture {
        async fn new() -> Self {
            let repo = Arc::new(InMemoryEventRepository::new());
            let users = StaticUserDirectory::new();
            let clock = FixedClock(fixed_now());
            let host = Actor::host(users.add("Hana", Role::Host));
            let client = Actor::client(users.add("Cy", Role::Client));
            let command = CreatePlace {
                correlation_id: Uuid::new_v4(),
                draft: PlaceDraft {
                    title: "Loft".to_owned(),
                    address: "1 Main St".to_owned(),
                    max_guests: Some(10),
                    price: Some(50.0),
                    ..PlaceDraft::default()
                },
            };
            let place_id = handle_create_place(&command, &host.into(), &clock, repo.as_ref())
                .await
                .unwrap()
                .place
                .id;
            Self {
                repo,
                users,
                clock,
                host,
                client,
                place_id,
            }
        }

        fn booking_command(&self, guests: i64) -> CreateBooking {
            CreateBooking {
                correlation_id: Uuid::new_v4(),
                place_id: self.place_id,
                draft: BookingDraft {
                    check_in_date: NaiveDate::from_ymd_opt(2026, 3, 10),
                    check_out_date: NaiveDate::from_ymd_opt(2026, 3, 12),
                    num_of_guests: Some(guests),
                    guest_name: "Cy".to_owned(),
                    guest_phone: "555-0100".to_owned(),
                    total_price: Some(120.0),
                },
            }
        }

        async fn book(&self) -> Uuid {
            handle_create_booking(
                &self.booking_command(2),
                &self.client.into(),
                &self.clock,
                self.repo.as_ref(),
            )
            .await
            .unwrap()
            .booking
            .id
        }

        async fn update(
            &self,
            caller: Caller,
            booking_id: Uuid,
            status: &str,
        ) -> Result<super::BookingCommandResult, DomainError> {
            let command = UpdateBookingStatus {
                correlation_id: Uuid::new_v4(),
                booking_id,
                status: status.to_owned(),
            };
            handle_update_booking_status(
                &command,
                &caller,
                &self.clock,
                self.repo.as_ref(),
                &self.users,
            )
            .await
        }
    }

    #[tokio::test]
    async fn test_create_booking_starts_pending_and_attaches_to_place() {
        // Arrange
        let fx = Fixture::new().await;

        // Act
        let result = handle_create_booking(
            &fx.booking_command(2),
            &fx.client.into(),
            &fx.clock,
            fx.repo.as_ref(),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.booking.status, BookingStatus::Pending);
        assert_eq!(result.booking.requester_id, fx.client.user_id);
        assert_eq!(result.booking.nights, 2);
        assert_eq!(result.stored_events.len(), 2);
        let place = load_place(fx.place_id, fx.repo.as_ref()).await.unwrap();
        assert_eq!(place.booking_ids(), &[result.booking.id]);
    }

    #[tokio::test]
    async fn test_owner_cannot_book_own_place() {
        let fx = Fixture::new().await;

        let result = handle_create_booking(
            &fx.booking_command(2),
            &fx.host.into(),
            &fx.clock,
            fx.repo.as_ref(),
        )
        .await;

        assert!(matches!(result, Err(DomainError::Authorization(_))));
        assert_eq!(fx.repo.stream_len(fx.place_id), 1);
    }

    #[tokio::test]
    async fn test_other_host_may_book() {
        let fx = Fixture::new().await;
        let other_host = Actor::host(fx.users.add("Omar", Role::Host));

        let result = handle_create_booking(
            &fx.booking_command(2),
            &other_host.into(),
            &fx.clock,
            fx.repo.as_ref(),
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_booking_validates_against_capacity() {
        let fx = Fixture::new().await;

        let result = handle_create_booking(
            &fx.booking_command(11),
            &fx.client.into(),
            &fx.clock,
            fx.repo.as_ref(),
        )
        .await;

        match result.unwrap_err() {
            DomainError::Validation { field, .. } => assert_eq!(field, "numOfGuests"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_booking_on_unknown_place_is_not_found() {
        let fx = Fixture::new().await;
        let mut command = fx.booking_command(2);
        command.place_id = Uuid::new_v4();

        let result =
            handle_create_booking(&command, &fx.client.into(), &fx.clock, fx.repo.as_ref()).await;

        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "place", .. })
        ));
    }

    #[tokio::test]
    async fn test_anonymous_booking_is_denied() {
        let fx = Fixture::new().await;

        let result = handle_create_booking(
            &fx.booking_command(2),
            &Caller::Anonymous,
            &fx.clock,
            fx.repo.as_ref(),
        )
        .await;

        assert!(matches!(result, Err(DomainError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_host_approves_and_booking_stays_visible() {
        // Arrange
        let fx = Fixture::new().await;
        let booking_id = fx.book().await;

        // Act
        let result = fx
            .update(fx.host.into(), booking_id, "approved")
            .await
            .unwrap();

        // Assert
        assert_eq!(result.booking.status, BookingStatus::Approved);
        assert_eq!(result.booking.resolution, Some(Resolution::Approved));
        assert_eq!(result.booking.decided_by, Some(fx.host.user_id));
        assert_eq!(result.booking.requester.as_ref().unwrap().name, "Cy");
        assert_eq!(result.stored_events[0].event_type, "booking.approved");
    }

    #[tokio::test]
    async fn test_client_cancel_after_approval_is_invalid_transition() {
        // Arrange
        let fx = Fixture::new().await;
        let booking_id = fx.book().await;
        fx.update(fx.host.into(), booking_id, "approved")
            .await
            .unwrap();

        // Act
        let result = fx.update(fx.client.into(), booking_id, "rejected").await;

        // Assert
        match result.unwrap_err() {
            DomainError::InvalidTransition { from, to } => {
                assert_eq!(from, "approved");
                assert_eq!(to, "rejected");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_cancel_of_pending_booking_is_recorded_as_cancellation() {
        let fx = Fixture::new().await;
        let booking_id = fx.book().await;

        let result = fx
            .update(fx.client.into(), booking_id, "Rejected")
            .await
            .unwrap();

        assert_eq!(result.booking.status, BookingStatus::Rejected);
        assert_eq!(result.booking.resolution, Some(Resolution::Cancelled));
        assert_eq!(result.stored_events[0].event_type, "booking.cancelled");
    }

    #[tokio::test]
    async fn test_other_client_cannot_change_status() {
        // Arrange
        let fx = Fixture::new().await;
        let booking_id = fx.book().await;
        let intruder = Actor::client(fx.users.add("Dee", Role::Client));

        // Act
        let result = fx.update(intruder.into(), booking_id, "rejected").await;

        // Assert
        assert!(matches!(result, Err(DomainError::Authorization(_))));
        let booking = load_booking(booking_id, fx.repo.as_ref()).await.unwrap();
        assert_eq!(booking.status(), BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_requester_cannot_approve_own_booking() {
        let fx = Fixture::new().await;
        let booking_id = fx.book().await;

        let result = fx.update(fx.client.into(), booking_id, "approved").await;

        assert!(matches!(result, Err(DomainError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_unknown_target_status_is_validation_error() {
        let fx = Fixture::new().await;
        let booking_id = fx.book().await;

        match fx.update(fx.host.into(), booking_id, "archived").await.unwrap_err() {
            DomainError::Validation { field, .. } => assert_eq!(field, "status"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_anonymous_caller_with_unknown_status_is_denied() {
        // Arrange
        let fx = Fixture::new().await;
        let booking_id = fx.book().await;

        // Act
        let result = fx.update(Caller::Anonymous, booking_id, "archived").await;

        // Assert
        assert!(matches!(result, Err(DomainError::Authorization(_))));
        assert_eq!(fx.repo.stream_len(booking_id), 1);
    }

    #[tokio::test]
    async fn test_reopening_is_denied() {
        let fx = Fixture::new().await;
        let booking_id = fx.book().await;

        let result = fx.update(fx.host.into(), booking_id, "pending").await;

        assert!(matches!(result, Err(DomainError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_status_update_of_unknown_booking_is_not_found() {
        let fx = Fixture::new().await;

        let result = fx.update(fx.host.into(), Uuid::new_v4(), "approved").await;

        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "booking", .. })
        ));
    }

    #[tokio::test]
    async fn test_status_update_on_a_place_id_is_not_found() {
        // Arrange
        let fx = Fixture::new().await;

        // Act
        let loaded = load_booking(fx.place_id, fx.repo.as_ref()).await;
        let updated = fx.update(fx.host.into(), fx.place_id, "approved").await;

        // Assert
        assert!(matches!(
            loaded,
            Err(DomainError::NotFound { entity: "booking", .. })
        ));
        assert!(matches!(
            updated,
            Err(DomainError::NotFound { entity: "booking", .. })
        ));
        assert!(load_place(fx.place_id, fx.repo.as_ref()).await.is_ok());
    }

    #[tokio::test]
    async fn test_loser_of_approve_reject_race_sees_invalid_transition() {
        // Arrange: the client reads the booking while it is still pending,
        // then the host approves before the client's cancel is written.
        let fx = Fixture::new().await;
        let booking_id = fx.book().await;
        let snapshot = fx.repo.load_events(booking_id).await.unwrap();
        fx.update(fx.host.into(), booking_id, "approved")
            .await
            .unwrap();
        let stale_repo = StaleOnceRepository {
            inner: Arc::clone(&fx.repo),
            stale: Mutex::new(Some((booking_id, snapshot))),
        };
        let command = UpdateBookingStatus {
            correlation_id: Uuid::new_v4(),
            booking_id,
            status: "rejected".to_owned(),
        };

        // Act
        let result = handle_update_booking_status(
            &command,
            &fx.client.into(),
            &fx.clock,
            &stale_repo,
            &fx.users,
        )
        .await;

        // Assert
        assert!(matches!(
            result,
            Err(DomainError::InvalidTransition { .. })
        ));
        let booking = load_booking(booking_id, fx.repo.as_ref()).await.unwrap();
        assert_eq!(booking.status(), BookingStatus::Approved);
        assert_eq!(fx.repo.stream_len(booking_id), 2);
    }

    #[tokio::test]
    async fn test_interleaved_approve_and_reject_have_exactly_one_winner() {
        // Arrange: both handlers read the pending booking before either writes.
        let fx = Fixture::new().await;
        let booking_id = fx.book().await;
        let repo = YieldingRepository {
            inner: Arc::clone(&fx.repo),
        };
        let approve_command = UpdateBookingStatus {
            correlation_id: Uuid::new_v4(),
            booking_id,
            status: "approved".to_owned(),
        };
        let reject_command = UpdateBookingStatus {
            correlation_id: Uuid::new_v4(),
            booking_id,
            status: "rejected".to_owned(),
        };
        let host: Caller = fx.host.into();

        // Act
        let (approve, reject) = tokio::join!(
            handle_update_booking_status(&approve_command, &host, &fx.clock, &repo, &fx.users),
            handle_update_booking_status(&reject_command, &host, &fx.clock, &repo, &fx.users),
        );

        // Assert
        assert!(approve.is_ok());
        assert!(matches!(
            reject,
            Err(DomainError::InvalidTransition { .. })
        ));
        let booking = load_booking(booking_id, fx.repo.as_ref()).await.unwrap();
        assert_eq!(booking.status(), BookingStatus::Approved);
        assert_eq!(fx.repo.stream_len(booking_id), 2);
    }

    #[tokio::test]
    async fn test_create_booking_propagates_repository_failure() {
        let fx = Fixture::new().await;

        let result = handle_create_booking(
            &fx.booking_command(2),
            &fx.client.into(),
            &fx.clock,
            &FailingEventRepository,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
