//! Caller resolution from the trusted identity header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use roomly_core::identity::Caller;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// The resolved caller of a request.
///
/// A missing or malformed header, or an id no user is registered under,
/// resolves to `Caller::Anonymous`; the handlers decide whether that is
/// acceptable.
#[derive(Debug, Clone, Copy)]
pub struct CurrentCaller(pub Caller);

impl FromRequestParts<AppState> for CurrentCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(&state.identity_header) else {
            return Ok(Self(Caller::Anonymous));
        };
        let Some(user_id) = raw
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
        else {
            debug!(header = %state.identity_header, "malformed identity header");
            return Ok(Self(Caller::Anonymous));
        };

        match state.users.find_user(user_id).await? {
            Some(profile) => Ok(Self(Caller::Authenticated(profile.actor()))),
            None => {
                debug!(%user_id, "identity header names an unknown user");
                Ok(Self(Caller::Anonymous))
            }
        }
    }
}
