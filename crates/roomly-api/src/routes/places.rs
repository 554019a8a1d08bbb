//! Routes for the Place Registry and place deletion.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use roomly_access::require_authenticated;
use roomly_cascade::application::command_handlers::handle_delete_place;
use roomly_cascade::domain::commands::DeletePlace;
use roomly_places::application::command_handlers::{handle_create_place, handle_update_place};
use roomly_places::application::query_handlers::{
    PlaceFilter, PlaceView, get_place, list_places, list_places_by_owner,
};
use roomly_places::domain::commands::{CreatePlace, UpdatePlace};
use roomly_places::domain::values::{PhotoRef, PlaceDraft};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::CurrentCaller;
use crate::state::AppState;

/// Body of `POST /places` and `PUT /places/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaceRequest {
    /// Listing title.
    pub title: String,
    /// Street address.
    pub address: String,
    /// Photos, hosted or by path.
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
    /// Price.
    pub price: Option<f64>,
    /// First bookable day.
    pub start_date: Option<NaiveDate>,
    /// Last bookable day.
    pub end_date: Option<NaiveDate>,
}

impl From<PlaceRequest> for PlaceDraft {
    fn from(req: PlaceRequest) -> Self {
        Self {
            title: req.title,
            address: req.address,
            photos: req.photos,
            description: req.description,
            perks: req.perks,
            extra_info: req.extra_info,
            check_in: req.check_in,
            check_out: req.check_out,
            max_guests: req.max_guests,
            price: req.price,
            start_date: req.start_date,
            end_date: req.end_date,
        }
    }
}

/// Response of `DELETE /places/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePlaceResponse {
    /// The deleted place.
    pub place_id: Uuid,
    /// Bookings removed with it.
    pub removed_bookings: Vec<Uuid>,
}

/// POST /places
#[instrument(skip(state, body))]
async fn create_place(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Json(body): Json<PlaceRequest>,
) -> Result<(StatusCode, Json<PlaceView>), ApiError> {
    let command = CreatePlace {
        correlation_id: Uuid::new_v4(),
        draft: body.into(),
    };
    let result = handle_create_place(
        &command,
        &caller,
        state.clock.as_ref(),
        state.event_repository.as_ref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(result.place)))
}

/// GET /places
#[instrument(skip(state))]
async fn search_places(
    State(state): State<AppState>,
    Query(filter): Query<PlaceFilter>,
) -> Result<Json<Vec<PlaceView>>, ApiError> {
    let places = list_places(&filter, state.event_repository.as_ref()).await?;
    Ok(Json(places))
}

/// GET /places/owned
#[instrument(skip(state))]
async fn owned_places(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<Vec<PlaceView>>, ApiError> {
    let actor = require_authenticated(&caller)?;
    let places = list_places_by_owner(actor.user_id, state.event_repository.as_ref()).await?;
    Ok(Json(places))
}

/// GET /places/{id}
#[instrument(skip(state))]
async fn place_by_id(
    State(state): State<AppState>,
    Path(place_id): Path<Uuid>,
) -> Result<Json<PlaceView>, ApiError> {
    let place = get_place(place_id, state.event_repository.as_ref()).await?;
    Ok(Json(place))
}

/// PUT /places/{id}
#[instrument(skip(state, body))]
async fn update_place(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(place_id): Path<Uuid>,
    Json(body): Json<PlaceRequest>,
) -> Result<Json<PlaceView>, ApiError> {
    let command = UpdatePlace {
        correlation_id: Uuid::new_v4(),
        place_id,
        draft: body.into(),
    };
    let result = handle_update_place(
        &command,
        &caller,
        state.clock.as_ref(),
        state.event_repository.as_ref(),
    )
    .await?;
    Ok(Json(result.place))
}

/// DELETE /places/{id}
#[instrument(skip(state))]
async fn delete_place(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(place_id): Path<Uuid>,
) -> Result<Json<DeletePlaceResponse>, ApiError> {
    let command = DeletePlace {
        correlation_id: Uuid::new_v4(),
        place_id,
    };
    let result = handle_delete_place(
        &command,
        &caller,
        state.clock.as_ref(),
        state.event_repository.as_ref(),
    )
    .await?;
    Ok(Json(DeletePlaceResponse {
        place_id: result.place_id,
        removed_bookings: result.removed_bookings,
    }))
}

/// Returns the router for the place context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_places).post(create_place))
        .route("/owned", get(owned_places))
        .route(
            "/{id}",
            get(place_by_id).put(update_place).delete(delete_place),
        )
}
