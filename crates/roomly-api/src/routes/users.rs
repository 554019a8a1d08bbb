//! Routes for the Identity context.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use roomly_core::identity::{Role, UserProfile};
use roomly_identity::application::command_handlers::handle_register_user;
use roomly_identity::application::query_handlers::get_user_profile;
use roomly_identity::domain::commands::RegisterUser;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::CurrentCaller;
use crate::state::AppState;

/// Body of `POST /users`.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Requested role; clients when omitted.
    pub role: Option<Role>,
}

/// POST /users
#[instrument(skip(state, body), fields(email = %body.email))]
async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let command = RegisterUser {
        correlation_id: Uuid::new_v4(),
        name: body.name,
        email: body.email,
        role: body.role,
    };
    let result = handle_register_user(
        &command,
        state.clock.as_ref(),
        state.event_repository.as_ref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(result.profile)))
}

/// GET /users/me
#[instrument(skip(state))]
async fn current_user(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<UserProfile>, ApiError> {
    let actor = roomly_access::require_authenticated(&caller)?;
    let profile = get_user_profile(actor.user_id, state.event_repository.as_ref()).await?;
    Ok(Json(profile))
}

/// GET /users/{id}
#[instrument(skip(state))]
async fn user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = get_user_profile(user_id, state.event_repository.as_ref()).await?;
    Ok(Json(profile))
}

/// Returns the router for the identity context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register_user))
        .route("/me", get(current_user))
        .route("/{id}", get(user_profile))
}
