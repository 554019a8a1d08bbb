//! The authorization decision table.

use roomly_core::error::DomainError;
use roomly_core::identity::{Actor, Caller, Role};
use tracing::warn;
use uuid::Uuid;

/// Requested change of a booking's status, as seen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Target status `approved`.
    Approve,
    /// Target status `rejected`: a host reject or a client cancel.
    Reject,
    /// Target status `pending`. Never granted.
    Reopen,
}

/// An action a caller wants to perform, with the ownership facts the
/// decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// List a new place.
    CreatePlace,
    /// Overwrite an existing place.
    UpdatePlace {
        /// Current owner of the place.
        owner_id: Uuid,
    },
    /// Delete a place together with its bookings.
    DeletePlace {
        /// Current owner of the place.
        owner_id: Uuid,
    },
    /// Request a booking on a place.
    CreateBooking {
        /// Owner of the place being booked.
        place_owner_id: Uuid,
    },
    /// Move a booking to another status.
    ChangeBookingStatus {
        /// The requested change.
        change: StatusChange,
        /// Owner of the booked place.
        place_owner_id: Uuid,
        /// User who requested the booking.
        requester_id: Uuid,
    },
    /// Read a single booking, including guest contact details.
    ViewBooking {
        /// Owner of the booked place.
        place_owner_id: Uuid,
        /// User who requested the booking.
        requester_id: Uuid,
    },
    /// Count pending bookings across one's own places.
    CountPendingBookings,
}

/// The capacity in which an action was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Allowed because the caller is a host.
    Host,
    /// Allowed because the caller hosts the place involved.
    PlaceOwner,
    /// Allowed because the caller requested the booking involved.
    Requester,
    /// Allowed to any authenticated user.
    Member,
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed.
    Allow(Grant),
    /// The action is refused.
    Deny(String),
}

/// Evaluates the rules in precedence order. Deterministic and free of side
/// effects.
#[must_use]
pub fn decide(caller: &Caller, action: &Action) -> Decision {
    let Some(actor) = caller.actor() else {
        return Decision::Deny("authentication required".to_owned());
    };

    match *action {
        Action::CreatePlace => require_host(actor, Grant::Host, "only hosts can list places"),
        Action::UpdatePlace { owner_id } => owner_only(actor, owner_id, "update"),
        Action::DeletePlace { owner_id } => owner_only(actor, owner_id, "delete"),
        Action::CreateBooking { place_owner_id } => {
            if actor.user_id == place_owner_id {
                Decision::Deny("owners cannot book their own place".to_owned())
            } else {
                Decision::Allow(Grant::Member)
            }
        }
        Action::ChangeBookingStatus {
            change,
            place_owner_id,
            requester_id,
        } => match change {
            StatusChange::Approve => {
                if is_owning_host(actor, place_owner_id) {
                    Decision::Allow(Grant::PlaceOwner)
                } else {
                    Decision::Deny("only the host of this place can approve".to_owned())
                }
            }
            StatusChange::Reject => {
                if is_owning_host(actor, place_owner_id) {
                    Decision::Allow(Grant::PlaceOwner)
                } else if actor.role == Role::Client && actor.user_id == requester_id {
                    Decision::Allow(Grant::Requester)
                } else {
                    Decision::Deny(
                        "only the host of this place or the requesting client can reject"
                            .to_owned(),
                    )
                }
            }
            StatusChange::Reopen => {
                Decision::Deny("bookings cannot be moved back to pending".to_owned())
            }
        },
        Action::ViewBooking {
            place_owner_id,
            requester_id,
        } => {
            if is_owning_host(actor, place_owner_id) {
                Decision::Allow(Grant::PlaceOwner)
            } else if actor.user_id == requester_id {
                Decision::Allow(Grant::Requester)
            } else {
                Decision::Deny("booking belongs to another user".to_owned())
            }
        }
        Action::CountPendingBookings => {
            require_host(actor, Grant::Host, "only hosts have pending requests")
        }
    }
}

/// Like [`decide`], but as a `Result` so handlers can use `?`.
///
/// # Errors
///
/// Returns `DomainError::Authorization` carrying the deny reason.
pub fn authorize(caller: &Caller, action: &Action) -> Result<Grant, DomainError> {
    match decide(caller, action) {
        Decision::Allow(grant) => Ok(grant),
        Decision::Deny(reason) => {
            warn!(?action, user_id = ?caller.actor().map(|a| a.user_id), %reason, "authorization denied");
            Err(DomainError::Authorization(reason))
        }
    }
}

/// Rule 1 on its own: resolves the acting user or refuses.
///
/// Handlers call this before loading anything so anonymous callers learn
/// nothing about stored entities.
///
/// # Errors
///
/// Returns `DomainError::Authorization` for anonymous callers.
pub fn require_authenticated(caller: &Caller) -> Result<&Actor, DomainError> {
    caller
        .actor()
        .ok_or_else(|| DomainError::Authorization("authentication required".to_owned()))
}

fn require_host(actor: &Actor, grant: Grant, reason: &str) -> Decision {
    if actor.role == Role::Host {
        Decision::Allow(grant)
    } else {
        Decision::Deny(reason.to_owned())
    }
}

fn owner_only(actor: &Actor, owner_id: Uuid, verb: &str) -> Decision {
    if is_owning_host(actor, owner_id) {
        Decision::Allow(Grant::PlaceOwner)
    } else {
        Decision::Deny(format!("only the owning host can {verb} this place"))
    }
}

fn is_owning_host(actor: &Actor, owner_id: Uuid) -> bool {
    actor.role == Role::Host && actor.user_id == owner_id
}
