//! Command handlers for the Cascade Coordinator.

use roomly_access::{Action, authorize, require_authenticated};
use roomly_bookings::application::command_handlers::reconstitute as reconstitute_booking;
use roomly_core::aggregate::AggregateRoot;
use roomly_core::clock::Clock;
use roomly_core::command::Command;
use roomly_core::error::DomainError;
use roomly_core::identity::Caller;
use roomly_core::repository::{EventRepository, StoredEvent, StreamAppend};
use roomly_places::application::command_handlers::{load_place, owner_of};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::commands::DeletePlace;

/// Result of a successful cascade.
#[derive(Debug)]
pub struct CascadeResult {
    /// The deleted place.
    pub place_id: Uuid,
    /// Bookings removed with it.
    pub removed_bookings: Vec<Uuid>,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Handles the `DeletePlace` command.
///
/// Every booking attached to the place receives `booking.removed` and the
/// place receives `place.deleted`, all in one batch guarded by each
/// stream's version. A booking created or decided concurrently makes the
/// batch fail as a whole.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the place does not exist, including
/// when it was already deleted, `DomainError::Authorization` unless the
/// caller is the owning host, `DomainError::ConcurrencyConflict` if any
/// involved stream changed concurrently, and `DomainError::Infrastructure`
/// if persistence fails. On any error nothing is written.
pub async fn handle_delete_place(
    command: &DeletePlace,
    caller: &Caller,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<CascadeResult, DomainError> {
    require_authenticated(caller)?;
    let mut place = load_place(command.place_id, repo).await?;
    let owner_id = owner_of(&place)?;
    authorize(caller, &Action::DeletePlace { owner_id })?;

    let mut batch = Vec::with_capacity(place.booking_ids().len() + 1);
    let mut removed_bookings = Vec::new();
    for &booking_id in place.booking_ids() {
        let stored = repo.load_events(booking_id).await?;
        let mut booking = reconstitute_booking(booking_id, &stored)?;
        if !booking.is_active() {
            debug!(%booking_id, "skipping inactive booking");
            continue;
        }
        booking.remove(command.correlation_id, clock)?;
        debug!(
            correlation_id = %command.correlation_id,
            %booking_id,
            status = %booking.status(),
            "removing booking with its place"
        );
        batch.push(StreamAppend::from_events(
            booking_id,
            booking.version(),
            booking.uncommitted_events(),
        ));
        removed_bookings.push(booking_id);
    }

    place.delete(removed_bookings.clone(), command.correlation_id, clock)?;
    batch.push(StreamAppend::from_events(
        command.place_id,
        place.version(),
        place.uncommitted_events(),
    ));

    if let Err(err) = repo.append_batch(&batch).await {
        if matches!(err, DomainError::ConcurrencyConflict { .. }) {
            // A concurrent cascade may have won; report that as absence.
            load_place(command.place_id, repo).await?;
        }
        return Err(err);
    }
    place.commit();

    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        place_id = %command.place_id,
        removed = removed_bookings.len(),
        "place deleted"
    );
    Ok(CascadeResult {
        place_id: command.place_id,
        removed_bookings,
        stored_events: batch.into_iter().flat_map(|a| a.events).collect(),
    })
}
