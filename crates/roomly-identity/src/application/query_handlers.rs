//! Query handlers for the Identity context.

use roomly_core::error::DomainError;
use roomly_core::identity::UserProfile;
use roomly_core::repository::EventRepository;
use uuid::Uuid;

use crate::application::command_handlers;

/// Retrieves the profile of a registered user.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if no user is registered under the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_user_profile(
    user_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<UserProfile, DomainError> {
    find_user_profile(user_id, repo)
        .await?
        .ok_or(DomainError::NotFound {
            entity: "user",
            id: user_id,
        })
}

/// Like [`get_user_profile`] but reports absence as `None`.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if loading or deserialization fails.
pub async fn find_user_profile(
    user_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<Option<UserProfile>, DomainError> {
    let stored_events = repo.load_events(user_id).await?;
    if stored_events.is_empty() {
        return Ok(None);
    }
    let account = command_handlers::reconstitute(user_id, &stored_events)?;
    Ok(account.profile().cloned())
}
