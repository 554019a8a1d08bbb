//! Value objects describing a place.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use roomly_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Reference to a photo of a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhotoRef {
    /// A photo held by an image host.
    Hosted {
        /// Public URL of the image.
        url: String,
        /// Identifier of the image at the host.
        #[serde(rename = "publicId")]
        public_id: String,
    },
    /// A path or URL to a stored upload.
    Path(String),
}

impl PhotoRef {
    fn is_blank(&self) -> bool {
        match self {
            Self::Hosted { url, .. } => url.trim().is_empty(),
            Self::Path(path) => path.trim().is_empty(),
        }
    }
}

/// Dates between which a place can be booked. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    /// First bookable day.
    pub start_date: Option<NaiveDate>,
    /// Last bookable day.
    pub end_date: Option<NaiveDate>,
}

impl AvailabilityWindow {
    /// Builds a window, checking that `start <= end` when both are set.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on field `availability` if the start
    /// falls after the end.
    pub fn new(
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, DomainError> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(DomainError::validation(
                    "availability",
                    format!("start date {start} is after end date {end}"),
                ));
            }
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Whether `date` is not before the window opens.
    #[must_use]
    pub fn opens_by(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|start| date >= start)
    }

    /// Whether `date` is not after the window closes.
    #[must_use]
    pub fn still_open_on(&self, date: NaiveDate) -> bool {
        self.end_date.is_none_or(|end| date <= end)
    }
}

/// Check-in and check-out hour markers. Advisory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    /// Hour from which guests may arrive.
    pub check_in: Option<u8>,
    /// Hour by which guests leave.
    pub check_out: Option<u8>,
}

/// Raw, unvalidated place fields as submitted by a host.
#[derive(Debug, Clone, Default)]
pub struct PlaceDraft {
    /// Listing title.
    pub title: String,
    /// Street address.
    pub address: String,
    /// Photos in display order.
    pub photos: Vec<PhotoRef>,
    /// Long-form description.
    pub description: Option<String>,
    /// Amenity tags.
    pub perks: Vec<String>,
    /// House rules and other notes.
    pub extra_info: Option<String>,
    /// Advisory check-in hour.
    pub check_in: Option<u8>,
    /// Advisory check-out hour.
    pub check_out: Option<u8>,
    /// Guest capacity.
    pub max_guests: Option<i64>,
    /// Price per stay unit.
    pub price: Option<f64>,
    /// First bookable day.
    pub start_date: Option<NaiveDate>,
    /// Last bookable day.
    pub end_date: Option<NaiveDate>,
}

/// Validated place fields. Every update replaces all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    /// Listing title.
    pub title: String,
    /// Street address.
    pub address: String,
    /// Photos in display order.
    pub photos: Vec<PhotoRef>,
    /// Long-form description.
    pub description: String,
    /// Amenity tags.
    pub perks: BTreeSet<String>,
    /// House rules and other notes.
    pub extra_info: String,
    /// Advisory hour markers.
    pub daily_window: DailyWindow,
    /// Guest capacity, at least 1.
    pub max_guests: u32,
    /// Price, never negative.
    pub price: f64,
    /// Bookable date range.
    pub availability: AvailabilityWindow,
}

impl PlaceDetails {
    /// Validates and normalizes a draft.
    ///
    /// Title and address are required. Capacity below one becomes one and a
    /// negative or missing price becomes zero.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the first offending field.
    pub fn from_draft(draft: PlaceDraft) -> Result<Self, DomainError> {
        let title = required(&draft.title, "title")?;
        let address = required(&draft.address, "address")?;
        let availability = AvailabilityWindow::new(draft.start_date, draft.end_date)?;

        let photos = draft
            .photos
            .into_iter()
            .filter(|photo| !photo.is_blank())
            .collect();
        let perks = draft
            .perks
            .iter()
            .map(|perk| perk.trim())
            .filter(|perk| !perk.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(Self {
            title,
            address,
            photos,
            description: draft.description.unwrap_or_default(),
            perks,
            extra_info: draft.extra_info.unwrap_or_default(),
            daily_window: DailyWindow {
                check_in: draft.check_in,
                check_out: draft.check_out,
            },
            max_guests: coerce_max_guests(draft.max_guests),
            price: coerce_price(draft.price),
            availability,
        })
    }
}

fn required(value: &str, field: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "is required"));
    }
    Ok(trimmed.to_owned())
}

fn coerce_max_guests(value: Option<i64>) -> u32 {
    value
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v >= 1)
        .unwrap_or(1)
}

fn coerce_price(value: Option<f64>) -> f64 {
    value.filter(|p| p.is_finite() && *p >= 0.0).unwrap_or(0.0)
}
