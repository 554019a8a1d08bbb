//! Value objects for bookings.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use roomly_core::error::DomainError;
use roomly_places::domain::values::PlaceDetails;
use serde::{Deserialize, Serialize};

/// Status of a booking. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Awaiting a decision.
    Pending,
    /// Accepted by the host.
    Approved,
    /// Rejected by the host or cancelled by the requester.
    Rejected,
}

impl BookingStatus {
    /// Wire name of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::validation(
                "status",
                format!("unknown booking status '{s}'"),
            )),
        }
    }
}

/// How a booking left `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// The host approved.
    Approved,
    /// The host rejected.
    Rejected,
    /// The requester cancelled.
    Cancelled,
}

/// Raw booking fields as submitted by the requester.
#[derive(Debug, Clone, Default)]
pub struct BookingDraft {
    /// Arrival day.
    pub check_in_date: Option<NaiveDate>,
    /// Departure day.
    pub check_out_date: Option<NaiveDate>,
    /// Party size.
    pub num_of_guests: Option<i64>,
    /// Contact name.
    pub guest_name: String,
    /// Contact phone.
    pub guest_phone: String,
    /// Quoted price for the stay. Absent means zero.
    pub total_price: Option<f64>,
}

/// Validated booking fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    /// Arrival day.
    pub check_in_date: NaiveDate,
    /// Departure day, strictly after arrival.
    pub check_out_date: NaiveDate,
    /// Party size, between one and the place's capacity.
    pub num_of_guests: u32,
    /// Contact name.
    pub guest_name: String,
    /// Contact phone.
    pub guest_phone: String,
    /// Quoted price for the stay.
    pub total_price: f64,
}

impl BookingDetails {
    /// Validates a draft against the place being booked.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the first offending field.
    pub fn from_draft(draft: &BookingDraft, place: &PlaceDetails) -> Result<Self, DomainError> {
        let check_in_date = draft
            .check_in_date
            .ok_or_else(|| DomainError::validation("checkInDate", "is required"))?;
        let check_out_date = draft
            .check_out_date
            .ok_or_else(|| DomainError::validation("checkOutDate", "is required"))?;
        if check_in_date >= check_out_date {
            return Err(DomainError::validation(
                "checkOutDate",
                "must be after the check-in date",
            ));
        }
        if !place.availability.opens_by(check_in_date) {
            return Err(DomainError::validation(
                "checkInDate",
                "is before the place becomes available",
            ));
        }
        if !place.availability.still_open_on(check_out_date) {
            return Err(DomainError::validation(
                "checkOutDate",
                "is after the place stops being available",
            ));
        }

        let num_of_guests = draft
            .num_of_guests
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n >= 1)
            .ok_or_else(|| DomainError::validation("numOfGuests", "must be at least 1"))?;
        if num_of_guests > place.max_guests {
            return Err(DomainError::validation(
                "numOfGuests",
                format!("exceeds the place capacity of {}", place.max_guests),
            ));
        }

        let guest_name = required(&draft.guest_name, "guestName")?;
        let guest_phone = required(&draft.guest_phone, "guestPhone")?;
        let total_price = draft.total_price.unwrap_or(0.0);
        if !total_price.is_finite() || total_price < 0.0 {
            return Err(DomainError::validation(
                "totalPrice",
                "must be a non-negative amount",
            ));
        }

        Ok(Self {
            check_in_date,
            check_out_date,
            num_of_guests,
            guest_name,
            guest_phone,
            total_price,
        })
    }

    /// Calendar days between check-in and check-out.
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.check_out_date - self.check_in_date).num_days()
    }
}

fn required(value: &str, field: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "is required"));
    }
    Ok(trimmed.to_owned())
}
