//! Command handlers for the Place Registry.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: load aggregate, authorize, execute command,
//! persist events.

use roomly_access::{Action, authorize, require_authenticated};
use roomly_core::aggregate::AggregateRoot;
use roomly_core::clock::Clock;
use roomly_core::command::Command;
use roomly_core::error::DomainError;
use roomly_core::event::{EventMetadata, category_of, decode_payload};
use roomly_core::identity::Caller;
use roomly_core::repository::{EventRepository, StoredEvent};
use tracing::info;
use uuid::Uuid;

use crate::application::query_handlers::PlaceView;
use crate::domain::aggregates::Place;
use crate::domain::commands::{CreatePlace, UpdatePlace};
use crate::domain::events::{PLACE_EVENT_CATEGORY, PlaceEvent, PlaceEventKind};
use crate::domain::values::PlaceDetails;

/// Result of a successful place command.
#[derive(Debug)]
pub struct PlaceCommandResult {
    /// The place after the command.
    pub place: PlaceView,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Reconstitutes a `Place` from stored events.
///
/// A stream belonging to another aggregate type yields a place that was
/// never created.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub fn reconstitute(place_id: Uuid, existing_events: &[StoredEvent]) -> Result<Place, DomainError> {
    let mut place = Place::new(place_id);
    if existing_events
        .iter()
        .any(|e| category_of(&e.event_type) != PLACE_EVENT_CATEGORY)
    {
        return Ok(place);
    }
    for stored in existing_events {
        let kind: PlaceEventKind = decode_payload(stored)?;
        place.apply(&PlaceEvent {
            metadata: EventMetadata::from_stored(stored),
            kind,
        });
    }
    Ok(place)
}

/// Loads a listed place.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the place was never created or has
/// been deleted, and `DomainError::Infrastructure` if loading fails.
pub async fn load_place(place_id: Uuid, repo: &dyn EventRepository) -> Result<Place, DomainError> {
    let stored_events = repo.load_events(place_id).await?;
    let place = reconstitute(place_id, &stored_events)?;
    if place.is_listed() {
        Ok(place)
    } else {
        Err(DomainError::NotFound {
            entity: "place",
            id: place_id,
        })
    }
}

/// Handles the `CreatePlace` command. The caller becomes the owner.
///
/// # Errors
///
/// Returns `DomainError::Authorization` unless the caller is a host,
/// `DomainError::Validation` for a missing title or address or an inverted
/// availability window, and `DomainError::Infrastructure` if persistence
/// fails.
pub async fn handle_create_place(
    command: &CreatePlace,
    caller: &Caller,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<PlaceCommandResult, DomainError> {
    let actor = require_authenticated(caller)?;
    authorize(caller, &Action::CreatePlace)?;
    let details = PlaceDetails::from_draft(command.draft.clone())?;

    let place_id = Uuid::new_v4();
    let mut place = Place::new(place_id);
    place.create(actor.user_id, details, command.correlation_id, clock)?;

    let stored_events = persist(&mut place, repo).await?;
    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        place_id = %place_id,
        owner_id = %actor.user_id,
        "place created"
    );
    Ok(PlaceCommandResult {
        place: PlaceView::from_place(&place)?,
        stored_events,
    })
}

/// Handles the `UpdatePlace` command, replacing every mutable field.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the place does not exist,
/// `DomainError::Authorization` unless the caller is the owning host,
/// `DomainError::Validation` for invalid fields,
/// `DomainError::ConcurrencyConflict` if the place changed concurrently, and
/// `DomainError::Infrastructure` if persistence fails.
pub async fn handle_update_place(
    command: &UpdatePlace,
    caller: &Caller,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<PlaceCommandResult, DomainError> {
    require_authenticated(caller)?;
    let mut place = load_place(command.place_id, repo).await?;
    let owner_id = owner_of(&place)?;
    authorize(caller, &Action::UpdatePlace { owner_id })?;

    let details = PlaceDetails::from_draft(command.draft.clone())?;
    place.update(details, command.correlation_id, clock)?;

    let stored_events = persist(&mut place, repo).await?;
    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        place_id = %command.place_id,
        "place updated"
    );
    Ok(PlaceCommandResult {
        place: PlaceView::from_place(&place)?,
        stored_events,
    })
}

/// Owner of a listed place.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the place is not listed.
pub fn owner_of(place: &Place) -> Result<Uuid, DomainError> {
    place.owner_id().ok_or(DomainError::NotFound {
        entity: "place",
        id: place.id,
    })
}

async fn persist(
    place: &mut Place,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let stored_events: Vec<StoredEvent> = place
        .uncommitted_events()
        .iter()
        .map(StoredEvent::from_event)
        .collect();
    repo.append_events(place.id, place.version(), &stored_events)
        .await?;
    place.commit();
    Ok(stored_events)
}

#[cfg(test)]
mod tests {
    use roomly_core::error::DomainError;
    use roomly_core::identity::{Actor, Caller};
    use roomly_core::repository::{EventRepository, StoredEvent};
    use roomly_test_support::{
        FailingEventRepository, FixedClock, InMemoryEventRepository, fixed_now,
    };
    use uuid::Uuid;

    use super::{handle_create_place, handle_update_place, load_place};
    use crate::domain::commands::{CreatePlace, UpdatePlace};
    use crate::domain::values::PlaceDraft;

    fn draft(title: &str) -> PlaceDraft {
        PlaceDraft {
            title: title.to_owned(),
            address: "1 Main St".to_owned(),
            max_guests: Some(3),
            price: Some(80.0),
            ..PlaceDraft::default()
        }
    }

    fn create(title: &str) -> CreatePlace {
        CreatePlace {
            correlation_id: Uuid::new_v4(),
            draft: draft(title),
        }
    }

    #[tokio::test]
    async fn test_create_place_assigns_caller_as_owner() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let repo = InMemoryEventRepository::new();
        let host = Actor::host(Uuid::new_v4());

        // Act
        let result = handle_create_place(&create("Loft"), &host.into(), &clock, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.place.owner_id, host.user_id);
        assert_eq!(result.place.title, "Loft");
        assert_eq!(result.place.max_guests, 3);
        assert_eq!(result.stored_events.len(), 1);
        assert_eq!(result.stored_events[0].event_type, "place.created");
        assert_eq!(repo.stream_len(result.place.id), 1);
    }

    #[tokio::test]
    async fn test_create_place_denies_clients_and_anonymous_callers() {
        let clock = FixedClock(fixed_now());
        let repo = InMemoryEventRepository::new();

        for caller in [Caller::from(Actor::client(Uuid::new_v4())), Caller::Anonymous] {
            let result = handle_create_place(&create("Loft"), &caller, &clock, &repo).await;
            assert!(matches!(result, Err(DomainError::Authorization(_))));
        }
        assert!(repo.all_events().is_empty());
    }

    #[tokio::test]
    async fn test_create_place_rejects_missing_title() {
        let clock = FixedClock(fixed_now());
        let repo = InMemoryEventRepository::new();
        let host = Actor::host(Uuid::new_v4());

        let result = handle_create_place(&create(" "), &host.into(), &clock, &repo).await;

        match result.unwrap_err() {
            DomainError::Validation { field, .. } => assert_eq!(field, "title"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_place_replaces_fields_for_owner() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let repo = InMemoryEventRepository::new();
        let host = Actor::host(Uuid::new_v4());
        let created = handle_create_place(&create("Loft"), &host.into(), &clock, &repo)
            .await
            .unwrap();
        let command = UpdatePlace {
            correlation_id: Uuid::new_v4(),
            place_id: created.place.id,
            draft: draft("Penthouse"),
        };

        // Act
        let updated = handle_update_place(&command, &host.into(), &clock, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(updated.place.title, "Penthouse");
        assert_eq!(updated.place.owner_id, host.user_id);
        let reloaded = load_place(created.place.id, &repo).await.unwrap();
        assert_eq!(reloaded.details().unwrap().title, "Penthouse");
    }

    #[tokio::test]
    async fn test_update_place_denies_other_host() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let repo = InMemoryEventRepository::new();
        let owner = Actor::host(Uuid::new_v4());
        let created = handle_create_place(&create("Loft"), &owner.into(), &clock, &repo)
            .await
            .unwrap();
        let command = UpdatePlace {
            correlation_id: Uuid::new_v4(),
            place_id: created.place.id,
            draft: draft("Mine now"),
        };

        // Act
        let intruder = Actor::host(Uuid::new_v4());
        let result = handle_update_place(&command, &intruder.into(), &clock, &repo).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Authorization(_))));
        assert_eq!(repo.stream_len(created.place.id), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_place_returns_not_found() {
        let clock = FixedClock(fixed_now());
        let repo = InMemoryEventRepository::new();
        let command = UpdatePlace {
            correlation_id: Uuid::new_v4(),
            place_id: Uuid::new_v4(),
            draft: draft("Loft"),
        };

        let result =
            handle_update_place(&command, &Actor::host(Uuid::new_v4()).into(), &clock, &repo).await;

        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "place", .. })
        ));
    }

    #[tokio::test]
    async fn test_anonymous_update_is_denied_before_lookup() {
        let clock = FixedClock(fixed_now());
        let command = UpdatePlace {
            correlation_id: Uuid::new_v4(),
            place_id: Uuid::new_v4(),
            draft: draft("Loft"),
        };

        // The failing store would surface Infrastructure if it were reached.
        let result =
            handle_update_place(&command, &Caller::Anonymous, &clock, &FailingEventRepository).await;

        assert!(matches!(result, Err(DomainError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_create_place_propagates_repository_failure() {
        let clock = FixedClock(fixed_now());
        let host = Actor::host(Uuid::new_v4());

        let result =
            handle_create_place(&create("Loft"), &host.into(), &clock, &FailingEventRepository).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_load_place_hides_unknown_streams() {
        let repo = InMemoryEventRepository::new();
        assert!(repo.load_events(Uuid::new_v4()).await.unwrap().is_empty());
        let result = load_place(Uuid::new_v4(), &repo).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_load_place_on_a_booking_stream_is_not_found() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let booking_id = Uuid::new_v4();
        let requested = StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: booking_id,
            event_type: "booking.requested".to_owned(),
            payload: serde_json::json!({ "type": "BookingRequested", "guests": 2 }),
            sequence_number: 1,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: fixed_now(),
        };
        repo.append_events(booking_id, 0, &[requested]).await.unwrap();

        // Act
        let result = load_place(booking_id, &repo).await;

        // Assert
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
