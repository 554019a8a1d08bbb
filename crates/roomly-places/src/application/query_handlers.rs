//! Query handlers for the Place Registry.
//!
//! Single places are reconstituted from their own stream; listings replay
//! the whole `place` category.

use chrono::{DateTime, NaiveDate, Utc};
use roomly_core::error::DomainError;
use roomly_core::repository::{EventRepository, group_streams};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::command_handlers::{load_place, owner_of, reconstitute};
use crate::domain::aggregates::Place;
use crate::domain::events::PLACE_EVENT_CATEGORY;
use crate::domain::values::{PhotoRef, PlaceDetails};

/// Read-only view of a place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceView {
    /// The place identifier.
    pub id: Uuid,
    /// The owning host.
    pub owner_id: Uuid,
    /// Listing title.
    pub title: String,
    /// Street address.
    pub address: String,
    /// Photos in display order.
    pub photos: Vec<PhotoRef>,
    /// Long-form description.
    pub description: String,
    /// Amenity tags, sorted.
    pub perks: Vec<String>,
    /// House rules and other notes.
    pub extra_info: String,
    /// Advisory check-in hour.
    pub check_in: Option<u8>,
    /// Advisory check-out hour.
    pub check_out: Option<u8>,
    /// Guest capacity.
    pub max_guests: u32,
    /// Price.
    pub price: f64,
    /// First bookable day.
    pub start_date: Option<NaiveDate>,
    /// Last bookable day.
    pub end_date: Option<NaiveDate>,
    /// Bookings attached to the place.
    pub booking_count: usize,
    /// When the place was listed.
    pub created_at: DateTime<Utc>,
    /// When the place last changed.
    pub updated_at: DateTime<Utc>,
}

impl PlaceView {
    /// Builds the view of a listed place.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the place is not listed.
    pub fn from_place(place: &Place) -> Result<Self, DomainError> {
        let owner_id = owner_of(place)?;
        let (Some(details), Some(created_at), Some(updated_at)) =
            (place.details(), place.created_at(), place.updated_at())
        else {
            return Err(DomainError::NotFound {
                entity: "place",
                id: place.id,
            });
        };
        let PlaceDetails {
            title,
            address,
            photos,
            description,
            perks,
            extra_info,
            daily_window,
            max_guests,
            price,
            availability,
        } = details.clone();
        Ok(Self {
            id: place.id,
            owner_id,
            title,
            address,
            photos,
            description,
            perks: perks.into_iter().collect(),
            extra_info,
            check_in: daily_window.check_in,
            check_out: daily_window.check_out,
            max_guests,
            price,
            start_date: availability.start_date,
            end_date: availability.end_date,
            booking_count: place.booking_ids().len(),
            created_at,
            updated_at,
        })
    }

    /// Whether the place passes `filter`.
    #[must_use]
    pub fn matches(&self, filter: &PlaceFilter) -> bool {
        let text_ok = filter
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .is_none_or(|text| {
                let needle = text.to_lowercase();
                self.title.to_lowercase().contains(&needle)
                    || self.address.to_lowercase().contains(&needle)
            });
        let guests_ok = filter.min_guests.is_none_or(|min| self.max_guests >= min);
        let price_ok = filter.max_price.is_none_or(|max| self.price <= max);
        text_ok && guests_ok && price_ok
    }
}

/// Compact place description embedded in booking views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSummary {
    /// The place identifier.
    pub id: Uuid,
    /// Listing title.
    pub title: String,
    /// Street address.
    pub address: String,
    /// Photos in display order.
    pub photos: Vec<PhotoRef>,
    /// Price.
    pub price: f64,
    /// Advisory check-in hour.
    pub check_in: Option<u8>,
    /// Advisory check-out hour.
    pub check_out: Option<u8>,
}

impl From<&PlaceView> for PlaceSummary {
    fn from(view: &PlaceView) -> Self {
        Self {
            id: view.id,
            title: view.title.clone(),
            address: view.address.clone(),
            photos: view.photos.clone(),
            price: view.price,
            check_in: view.check_in,
            check_out: view.check_out,
        }
    }
}

/// Optional narrowing of [`list_places`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceFilter {
    /// Case-insensitive substring of the title or address.
    pub text: Option<String>,
    /// Minimum guest capacity.
    pub min_guests: Option<u32>,
    /// Maximum price.
    pub max_price: Option<f64>,
}

/// Retrieves a listed place by ID.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the place does not exist or was
/// deleted, and `DomainError::Infrastructure` if loading fails.
pub async fn get_place(place_id: Uuid, repo: &dyn EventRepository) -> Result<PlaceView, DomainError> {
    let place = load_place(place_id, repo).await?;
    PlaceView::from_place(&place)
}

/// Every listed place, newest first.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if loading or deserialization fails.
pub async fn list_all_places(repo: &dyn EventRepository) -> Result<Vec<PlaceView>, DomainError> {
    list_places(&PlaceFilter::default(), repo).await
}

/// Listed places passing `filter`, newest first.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if loading or deserialization fails.
pub async fn list_places(
    filter: &PlaceFilter,
    repo: &dyn EventRepository,
) -> Result<Vec<PlaceView>, DomainError> {
    let views = load_listed_places(repo).await?;
    Ok(views.into_iter().filter(|v| v.matches(filter)).collect())
}

/// Listed places owned by `owner_id`, newest first.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if loading or deserialization fails.
pub async fn list_places_by_owner(
    owner_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<Vec<PlaceView>, DomainError> {
    let views = load_listed_places(repo).await?;
    Ok(views.into_iter().filter(|v| v.owner_id == owner_id).collect())
}

/// Replays the place category and returns every listed place, newest first.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if loading or deserialization fails.
pub async fn load_listed_places(repo: &dyn EventRepository) -> Result<Vec<PlaceView>, DomainError> {
    let events = repo.load_category(PLACE_EVENT_CATEGORY).await?;
    let mut views = Vec::new();
    for (place_id, stream) in group_streams(events) {
        let place = reconstitute(place_id, &stream)?;
        if place.is_listed() {
            views.push(PlaceView::from_place(&place)?);
        }
    }
    views.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(views)
}
