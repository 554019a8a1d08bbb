//! Command handlers for the Identity context.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: load aggregate, execute command, persist events.

use roomly_core::aggregate::AggregateRoot;
use roomly_core::clock::Clock;
use roomly_core::command::Command;
use roomly_core::error::DomainError;
use roomly_core::event::{EventMetadata, category_of, decode_payload};
use roomly_core::identity::{Role, UserProfile};
use roomly_core::repository::{EventRepository, StoredEvent, StreamAppend};
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Account, claim_email, email_claim_id, normalize_email};
use crate::domain::commands::RegisterUser;
use crate::domain::events::{IDENTITY_EVENT_CATEGORY, IdentityEvent, IdentityEventKind};

/// Result of a successful registration.
#[derive(Debug)]
pub struct RegistrationResult {
    /// The registered profile.
    pub profile: UserProfile,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Reconstitutes an `Account` from stored events. Streams of other
/// aggregate types yield an unregistered account.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute(
    user_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<Account, DomainError> {
    let mut account = Account::new(user_id);
    if existing_events
        .iter()
        .any(|e| category_of(&e.event_type) != IDENTITY_EVENT_CATEGORY)
    {
        return Ok(account);
    }
    for stored in existing_events {
        let kind: IdentityEventKind = decode_payload(stored)?;
        account.apply(&IdentityEvent {
            metadata: EventMetadata::from_stored(stored),
            kind,
        });
    }
    Ok(account)
}

/// Handles the `RegisterUser` command: claims the email and creates the
/// account in one atomic batch.
///
/// # Errors
///
/// Returns `DomainError::Validation` for malformed input or an email that is
/// already registered, and `DomainError::Infrastructure` if persistence fails.
pub async fn handle_register_user(
    command: &RegisterUser,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<RegistrationResult, DomainError> {
    let user_id = Uuid::new_v4();
    let mut account = Account::new(user_id);
    account.register(
        &command.name,
        &command.email,
        command.role.unwrap_or(Role::Client),
        command.correlation_id,
        clock,
    )?;

    let email = normalize_email(&command.email);
    let claim_id = email_claim_id(&email);
    if !repo.load_events(claim_id).await?.is_empty() {
        return Err(email_taken());
    }

    let claim = claim_email(&email, user_id, command.correlation_id, clock);
    let batch = [
        StreamAppend::from_events(claim_id, 0, std::slice::from_ref(&claim)),
        StreamAppend::from_events(user_id, account.version(), account.uncommitted_events()),
    ];
    repo.append_batch(&batch).await.map_err(|err| match err {
        // Someone else claimed the address between the check and the write.
        DomainError::ConcurrencyConflict { aggregate_id, .. } if aggregate_id == claim_id => {
            email_taken()
        }
        other => other,
    })?;

    account.commit();
    let profile = account
        .profile()
        .cloned()
        .ok_or_else(|| DomainError::Infrastructure("registration produced no profile".into()))?;
    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        user_id = %user_id,
        role = %profile.role,
        "user registered"
    );

    Ok(RegistrationResult {
        profile,
        stored_events: batch.into_iter().flat_map(|a| a.events).collect(),
    })
}

fn email_taken() -> DomainError {
    DomainError::validation("email", "already registered")
}
