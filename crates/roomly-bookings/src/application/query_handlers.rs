//! Query handlers for the Booking Ledger.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use roomly_access::{Action, Grant, authorize, require_authenticated};
use roomly_core::error::DomainError;
use roomly_core::identity::{Caller, Role, UserDirectory, UserProfile};
use roomly_core::repository::{EventRepository, group_streams};
use roomly_places::application::command_handlers::{load_place, owner_of};
use roomly_places::application::query_handlers::{
    PlaceSummary, PlaceView, list_places_by_owner, load_listed_places,
};
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers::{load_booking, reconstitute};
use crate::domain::aggregates::Booking;
use crate::domain::events::BOOKING_EVENT_CATEGORY;
use crate::domain::values::{BookingStatus, Resolution};

/// Identity of the user who requested a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequesterInfo {
    /// The user identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

impl From<UserProfile> for RequesterInfo {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
        }
    }
}

/// Read-only view of a booking with its place context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    /// The booking identifier.
    pub id: Uuid,
    /// The booked place.
    pub place_id: Uuid,
    /// The requesting user.
    pub requester_id: Uuid,
    /// Arrival day.
    pub check_in_date: NaiveDate,
    /// Departure day.
    pub check_out_date: NaiveDate,
    /// Calendar days between the dates.
    pub nights: i64,
    /// Party size.
    pub num_of_guests: u32,
    /// Contact name.
    pub guest_name: String,
    /// Contact phone.
    pub guest_phone: String,
    /// Quoted price for the stay.
    pub total_price: f64,
    /// Current status.
    pub status: BookingStatus,
    /// How the booking left `pending`.
    pub resolution: Option<Resolution>,
    /// Who resolved the booking.
    pub decided_by: Option<Uuid>,
    /// When the booking was resolved.
    pub decided_at: Option<DateTime<Utc>>,
    /// When the booking was requested.
    pub created_at: DateTime<Utc>,
    /// Summary of the booked place.
    pub place: PlaceSummary,
    /// Requester identity, attached for the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<RequesterInfo>,
}

impl BookingView {
    /// Builds the view of an active booking.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the booking is not active.
    pub fn build(
        booking: &Booking,
        place: PlaceSummary,
        requester: Option<RequesterInfo>,
    ) -> Result<Self, DomainError> {
        let not_found = || DomainError::NotFound {
            entity: "booking",
            id: booking.id,
        };
        if !booking.is_active() {
            return Err(not_found());
        }
        let details = booking.details().ok_or_else(not_found)?;
        Ok(Self {
            id: booking.id,
            place_id: booking.place_id().ok_or_else(not_found)?,
            requester_id: booking.requester_id().ok_or_else(not_found)?,
            check_in_date: details.check_in_date,
            check_out_date: details.check_out_date,
            nights: details.nights(),
            num_of_guests: details.num_of_guests,
            guest_name: details.guest_name.clone(),
            guest_phone: details.guest_phone.clone(),
            total_price: details.total_price,
            status: booking.status(),
            resolution: booking.resolution(),
            decided_by: booking.decided_by(),
            decided_at: booking.decided_at(),
            created_at: booking.requested_at().ok_or_else(not_found)?,
            place,
            requester,
        })
    }
}

/// Looks up the requester's identity, if the user still resolves.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the directory fails.
pub async fn requester_info(
    users: &dyn UserDirectory,
    requester_id: Option<Uuid>,
) -> Result<Option<RequesterInfo>, DomainError> {
    let Some(id) = requester_id else {
        return Ok(None);
    };
    Ok(users.find_user(id).await?.map(RequesterInfo::from))
}

/// Retrieves a booking visible to the caller: its requester or the host
/// of its place. The host also receives the requester's identity.
///
/// # Errors
///
/// Returns `DomainError::Authorization` for anonymous or unrelated callers,
/// `DomainError::NotFound` if the booking does not exist, and
/// `DomainError::Infrastructure` if loading fails.
pub async fn get_booking(
    caller: &Caller,
    booking_id: Uuid,
    repo: &dyn EventRepository,
    users: &dyn UserDirectory,
) -> Result<BookingView, DomainError> {
    require_authenticated(caller)?;
    let booking = load_booking(booking_id, repo).await?;
    let (place_id, requester_id) = booking_parties(&booking)?;
    let place = load_place(place_id, repo).await?;
    let grant = authorize(
        caller,
        &Action::ViewBooking {
            place_owner_id: owner_of(&place)?,
            requester_id,
        },
    )?;
    let requester = if grant == Grant::PlaceOwner {
        requester_info(users, Some(requester_id)).await?
    } else {
        None
    };
    let summary = PlaceSummary::from(&PlaceView::from_place(&place)?);
    BookingView::build(&booking, summary, requester)
}

/// Bookings relevant to the caller, newest first.
///
/// A host sees every booking on the places they own, with requester
/// identity. A client sees their own bookings except rejected ones.
///
/// # Errors
///
/// Returns `DomainError::Authorization` for anonymous callers and
/// `DomainError::Infrastructure` if loading fails.
pub async fn list_bookings_for_user(
    caller: &Caller,
    repo: &dyn EventRepository,
    users: &dyn UserDirectory,
) -> Result<Vec<BookingView>, DomainError> {
    let actor = *require_authenticated(caller)?;
    let bookings = load_active_bookings(repo).await?;

    let mut views = Vec::new();
    match actor.role {
        Role::Host => {
            let places = index_places(list_places_by_owner(actor.user_id, repo).await?);
            for booking in bookings {
                let Some(place) = booking.place_id().and_then(|id| places.get(&id)) else {
                    continue;
                };
                let requester = requester_info(users, booking.requester_id()).await?;
                views.push(BookingView::build(&booking, place.clone(), requester)?);
            }
        }
        Role::Client => {
            let places = index_places(load_listed_places(repo).await?);
            for booking in bookings {
                if booking.requester_id() != Some(actor.user_id)
                    || booking.status() == BookingStatus::Rejected
                {
                    continue;
                }
                let Some(place) = booking.place_id().and_then(|id| places.get(&id)) else {
                    continue;
                };
                views.push(BookingView::build(&booking, place.clone(), None)?);
            }
        }
    }
    views.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(views)
}

/// Number of pending bookings across the caller's places.
///
/// # Errors
///
/// Returns `DomainError::Authorization` unless the caller is a host and
/// `DomainError::Infrastructure` if loading fails.
pub async fn count_pending_for_host(
    caller: &Caller,
    repo: &dyn EventRepository,
) -> Result<usize, DomainError> {
    let actor = *require_authenticated(caller)?;
    authorize(caller, &Action::CountPendingBookings)?;
    let places = index_places(list_places_by_owner(actor.user_id, repo).await?);
    let bookings = load_active_bookings(repo).await?;
    Ok(bookings
        .iter()
        .filter(|b| b.status() == BookingStatus::Pending)
        .filter(|b| b.place_id().is_some_and(|id| places.contains_key(&id)))
        .count())
}

/// Replays the booking category and returns every active booking.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if loading or deserialization fails.
pub async fn load_active_bookings(repo: &dyn EventRepository) -> Result<Vec<Booking>, DomainError> {
    let events = repo.load_category(BOOKING_EVENT_CATEGORY).await?;
    let mut bookings = Vec::new();
    for (booking_id, stream) in group_streams(events) {
        let booking = reconstitute(booking_id, &stream)?;
        if booking.is_active() {
            bookings.push(booking);
        }
    }
    Ok(bookings)
}

/// Place and requester of an active booking.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the booking has never been requested.
pub fn booking_parties(booking: &Booking) -> Result<(Uuid, Uuid), DomainError> {
    match (booking.place_id(), booking.requester_id()) {
        (Some(place_id), Some(requester_id)) => Ok((place_id, requester_id)),
        _ => Err(DomainError::NotFound {
            entity: "booking",
            id: booking.id,
        }),
    }
}

fn index_places(places: Vec<PlaceView>) -> HashMap<Uuid, PlaceSummary> {
    places
        .iter()
        .map(|place| (place.id, PlaceSummary::from(place)))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use roomly_core::error::DomainError;
    use roomly_core::identity::{Actor, Caller, Role};
    use roomly_places::application::command_handlers::handle_create_place;
    use roomly_places::domain::commands::CreatePlace;
    use roomly_places::domain::values::PlaceDraft;
    use roomly_test_support::{FixedClock, InMemoryEventRepository, StaticUserDirectory, fixed_now};
    use uuid::Uuid;

    use super::{count_pending_for_host, get_booking, list_bookings_for_user};
    use crate::application::command_handlers::{handle_create_booking, handle_update_booking_status};
    use crate::domain::commands::{CreateBooking, UpdateBookingStatus};
    use crate::domain::values::{BookingDraft, BookingStatus};

    struct Fixture {
        repo: InMemoryEventRepository,
        users: StaticUserDirectory,
        host: Actor,
    }

    impl Fixture {
        fn new() -> Self {
            let users = StaticUserDirectory::new();
            let host = Actor::host(users.add("Hana", Role::Host));
            Self {
                repo: InMemoryEventRepository::new(),
                users,
                host,
            }
        }

        fn client(&self, name: &str) -> Actor {
            Actor::client(self.users.add(name, Role::Client))
        }

        async fn place(&self, owner: Actor) -> Uuid {
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
            handle_create_place(&command, &owner.into(), &FixedClock(fixed_now()), &self.repo)
                .await
                .unwrap()
                .place
                .id
        }

        async fn book(&self, client: Actor, place_id: Uuid, minutes: i64) -> Uuid {
            let command = CreateBooking {
                correlation_id: Uuid::new_v4(),
                place_id,
                draft: BookingDraft {
                    check_in_date: NaiveDate::from_ymd_opt(2026, 3, 10),
                    check_out_date: NaiveDate::from_ymd_opt(2026, 3, 12),
                    num_of_guests: Some(2),
                    guest_name: "Guest".to_owned(),
                    guest_phone: "555-0100".to_owned(),
                    total_price: Some(120.0),
                },
            };
            let clock = FixedClock(fixed_now() + Duration::minutes(minutes));
            handle_create_booking(&command, &client.into(), &clock, &self.repo)
                .await
                .unwrap()
                .booking
                .id
        }

        async fn set_status(&self, caller: Actor, booking_id: Uuid, status: &str) {
            let command = UpdateBookingStatus {
                correlation_id: Uuid::new_v4(),
                booking_id,
                status: status.to_owned(),
            };
            handle_update_booking_status(
                &command,
                &caller.into(),
                &FixedClock(fixed_now()),
                &self.repo,
                &self.users,
            )
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_count_pending_counts_only_pending_on_own_places() {
        // Arrange
        let fx = Fixture::new();
        let client = fx.client("Cy");
        let first = fx.place(fx.host).await;
        let second = fx.place(fx.host).await;
        let mut bookings = Vec::new();
        for (i, place) in [first, first, second, second, second].into_iter().enumerate() {
            bookings.push(fx.book(client, place, i64::try_from(i).unwrap()).await);
        }
        fx.set_status(fx.host, bookings[0], "approved").await;
        fx.set_status(fx.host, bookings[3], "approved").await;
        let other_host = Actor::host(fx.users.add("Omar", Role::Host));
        let elsewhere = fx.place(other_host).await;
        fx.book(client, elsewhere, 9).await;

        // Act
        let count = count_pending_for_host(&fx.host.into(), &fx.repo).await.unwrap();

        // Assert
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_count_pending_denies_clients() {
        let fx = Fixture::new();
        let client = fx.client("Cy");
        let result = count_pending_for_host(&client.into(), &fx.repo).await;
        assert!(matches!(result, Err(DomainError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_host_list_covers_own_places_with_requester_identity() {
        // Arrange
        let fx = Fixture::new();
        let client = fx.client("Cy");
        let place = fx.place(fx.host).await;
        let older = fx.book(client, place, 0).await;
        let newer = fx.book(client, place, 10).await;
        fx.set_status(fx.host, older, "rejected").await;

        // Act
        let views = list_bookings_for_user(&fx.host.into(), &fx.repo, &fx.users)
            .await
            .unwrap();

        // Assert
        let ids: Vec<Uuid> = views.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![newer, older]);
        let requester = views[0].requester.as_ref().unwrap();
        assert_eq!(requester.name, "Cy");
        assert_eq!(requester.email, "cy@example.com");
        assert_eq!(views[0].place.title, "Loft");
    }

    #[tokio::test]
    async fn test_client_list_excludes_rejected_and_foreign_bookings() {
        // Arrange
        let fx = Fixture::new();
        let client = fx.client("Cy");
        let other = fx.client("Dee");
        let place = fx.place(fx.host).await;
        let approved = fx.book(client, place, 0).await;
        let rejected = fx.book(client, place, 1).await;
        let pending = fx.book(client, place, 2).await;
        fx.book(other, place, 3).await;
        fx.set_status(fx.host, approved, "approved").await;
        fx.set_status(client, rejected, "rejected").await;

        // Act
        let views = list_bookings_for_user(&client.into(), &fx.repo, &fx.users)
            .await
            .unwrap();

        // Assert
        let ids: Vec<Uuid> = views.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![pending, approved]);
        assert!(views.iter().all(|v| v.requester.is_none()));
        assert_eq!(views[1].status, BookingStatus::Approved);
    }

    #[tokio::test]
    async fn test_list_requires_authentication() {
        let fx = Fixture::new();
        let result = list_bookings_for_user(&Caller::Anonymous, &fx.repo, &fx.users).await;
        assert!(matches!(result, Err(DomainError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_get_booking_is_limited_to_the_two_parties() {
        // Arrange
        let fx = Fixture::new();
        let client = fx.client("Cy");
        let stranger = fx.client("Eve");
        let place = fx.place(fx.host).await;
        let booking = fx.book(client, place, 0).await;

        // Act
        let as_host = get_booking(&fx.host.into(), booking, &fx.repo, &fx.users).await;
        let as_client = get_booking(&client.into(), booking, &fx.repo, &fx.users).await;
        let as_stranger = get_booking(&stranger.into(), booking, &fx.repo, &fx.users).await;

        // Assert
        assert!(as_host.unwrap().requester.is_some());
        let own = as_client.unwrap();
        assert!(own.requester.is_none());
        assert_eq!(own.nights, 2);
        assert!(matches!(as_stranger, Err(DomainError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_get_unknown_booking_is_not_found() {
        let fx = Fixture::new();
        let client = fx.client("Cy");
        let result = get_booking(&client.into(), Uuid::new_v4(), &fx.repo, &fx.users).await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "booking", .. })
        ));
    }
}
