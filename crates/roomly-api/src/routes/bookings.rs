//! Routes for the Booking Ledger.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use roomly_bookings::application::command_handlers::{
    handle_create_booking, handle_update_booking_status,
};
use roomly_bookings::application::query_handlers::{
    BookingView, count_pending_for_host, get_booking, list_bookings_for_user,
};
use roomly_bookings::domain::commands::{CreateBooking, UpdateBookingStatus};
use roomly_bookings::domain::values::BookingDraft;
use roomly_core::error::DomainError;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::CurrentCaller;
use crate::state::AppState;

/// Body of `POST /bookings`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// The place to book.
    pub place_id: Option<Uuid>,
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
    /// Quoted price for the stay.
    pub total_price: Option<f64>,
}

/// Body of `PUT /bookings/{id}/status`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    /// Target status: `pending`, `approved` or `rejected`.
    pub status: String,
}

/// Response of `GET /bookings/pending-count`.
#[derive(Debug, Serialize)]
pub struct PendingCountResponse {
    /// Pending bookings across the host's places.
    pub count: usize,
}

/// POST /bookings
#[instrument(skip(state, body), fields(place_id = ?body.place_id))]
async fn create_booking(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingView>), ApiError> {
    let place_id = body
        .place_id
        .ok_or_else(|| DomainError::validation("placeId", "is required"))?;
    let command = CreateBooking {
        correlation_id: Uuid::new_v4(),
        place_id,
        draft: BookingDraft {
            check_in_date: body.check_in_date,
            check_out_date: body.check_out_date,
            num_of_guests: body.num_of_guests,
            guest_name: body.guest_name,
            guest_phone: body.guest_phone,
            total_price: body.total_price,
        },
    };
    let result = handle_create_booking(
        &command,
        &caller,
        state.clock.as_ref(),
        state.event_repository.as_ref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(result.booking)))
}

/// GET /bookings
#[instrument(skip(state))]
async fn my_bookings(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<Vec<BookingView>>, ApiError> {
    let bookings = list_bookings_for_user(
        &caller,
        state.event_repository.as_ref(),
        state.users.as_ref(),
    )
    .await?;
    Ok(Json(bookings))
}

/// GET /bookings/pending-count
#[instrument(skip(state))]
async fn pending_count(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<PendingCountResponse>, ApiError> {
    let count = count_pending_for_host(&caller, state.event_repository.as_ref()).await?;
    Ok(Json(PendingCountResponse { count }))
}

/// GET /bookings/{id}
#[instrument(skip(state))]
async fn booking_by_id(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingView>, ApiError> {
    let booking = get_booking(
        &caller,
        booking_id,
        state.event_repository.as_ref(),
        state.users.as_ref(),
    )
    .await?;
    Ok(Json(booking))
}

/// PUT /bookings/{id}/status
#[instrument(skip(state, body), fields(status = %body.status))]
async fn update_status(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<BookingView>, ApiError> {
    let command = UpdateBookingStatus {
        correlation_id: Uuid::new_v4(),
        booking_id,
        status: body.status,
    };
    let result = handle_update_booking_status(
        &command,
        &caller,
        state.clock.as_ref(),
        state.event_repository.as_ref(),
        state.users.as_ref(),
    )
    .await?;
    Ok(Json(result.booking))
}

/// Returns the router for the booking context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking).get(my_bookings))
        .route("/pending-count", get(pending_count))
        .route("/{id}", get(booking_by_id))
        .route("/{id}/status", put(update_status))
}
