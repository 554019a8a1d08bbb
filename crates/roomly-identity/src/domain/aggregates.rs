//! Aggregate roots for the Identity context.

use roomly_core::aggregate::AggregateRoot;
use roomly_core::clock::Clock;
use roomly_core::error::DomainError;
use roomly_core::event::EventMetadata;
use roomly_core::identity::{Role, UserProfile};
use uuid::Uuid;

use super::events::{
    EMAIL_CLAIMED_EVENT_TYPE, EmailClaimed, IdentityEvent, IdentityEventKind,
    USER_REGISTERED_EVENT_TYPE, UserRegistered,
};

/// Namespace for deriving an email's claim stream id.
const EMAIL_CLAIM_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a8e_4b7d_4e19_9c35_d0a2_7e61_b8f4);

/// Trims and lowercases an email so lookups are case-insensitive.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Stream id that records who holds `email` (already normalized).
#[must_use]
pub fn email_claim_id(email: &str) -> Uuid {
    Uuid::new_v5(&EMAIL_CLAIM_NAMESPACE, email.as_bytes())
}

/// The aggregate root for a user account.
#[derive(Debug)]
pub struct Account {
    /// Aggregate identifier (the user id).
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// Profile, present once registered.
    pub(crate) profile: Option<UserProfile>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<IdentityEvent>,
}

impl Account {
    /// Creates an empty account stream.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            profile: None,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the registered profile, if any.
    #[must_use]
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    /// Registers the account, producing a `UserRegistered` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is blank, the email is
    /// malformed, or the account is already registered.
    pub fn register(
        &mut self,
        name: &str,
        email: &str,
        role: Role,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.profile.is_some() {
            return Err(DomainError::validation("id", "account already registered"));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name", "must not be empty"));
        }
        let email = normalize_email(email);
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !well_formed {
            return Err(DomainError::validation("email", "must be an email address"));
        }

        let event = IdentityEvent {
            metadata: EventMetadata::new(
                USER_REGISTERED_EVENT_TYPE,
                self.id,
                self.next_sequence_number(),
                correlation_id,
                clock.now(),
            ),
            kind: IdentityEventKind::UserRegistered(UserRegistered {
                user_id: self.id,
                name: name.to_owned(),
                email,
                role,
            }),
        };
        self.uncommitted_events.push(event);
        Ok(())
    }
}

impl AggregateRoot for Account {
    type Event = IdentityEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        if let IdentityEventKind::UserRegistered(payload) = &event.kind {
            self.profile = Some(UserProfile {
                id: payload.user_id,
                name: payload.name.clone(),
                email: payload.email.clone(),
                role: payload.role,
            });
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

/// Builds the single event that claims `email` for `user_id`.
#[must_use]
pub fn claim_email(
    email: &str,
    user_id: Uuid,
    correlation_id: Uuid,
    clock: &dyn Clock,
) -> IdentityEvent {
    IdentityEvent {
        metadata: EventMetadata::new(
            EMAIL_CLAIMED_EVENT_TYPE,
            email_claim_id(email),
            1,
            correlation_id,
            clock.now(),
        ),
        kind: IdentityEventKind::EmailClaimed(EmailClaimed {
            email: email.to_owned(),
            user_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomly_core::event::DomainEvent;
    use roomly_test_support::{FixedClock, fixed_now};

    #[test]
    fn test_register_produces_user_registered_event() {
        // Arrange
        let id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let clock = FixedClock(fixed_now());
        let mut account = Account::new(id);

        // Act
        account
            .register("  Ada ", "Ada@Example.COM ", Role::Host, correlation_id, &clock)
            .unwrap();

        // Assert
        let events = account.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), USER_REGISTERED_EVENT_TYPE);
        assert_eq!(events[0].metadata().sequence_number, 1);
        match &events[0].kind {
            IdentityEventKind::UserRegistered(payload) => {
                assert_eq!(payload.name, "Ada");
                assert_eq!(payload.email, "ada@example.com");
                assert_eq!(payload.role, Role::Host);
            }
            other => panic!("expected UserRegistered, got {other:?}"),
        }
    }

    #[test]
    fn test_register_rejects_blank_name_and_bad_email() {
        let clock = FixedClock(fixed_now());
        let mut account = Account::new(Uuid::new_v4());

        match account
            .register(" ", "a@b.c", Role::Client, Uuid::new_v4(), &clock)
            .unwrap_err()
        {
            DomainError::Validation { field, .. } => assert_eq!(field, "name"),
            other => panic!("expected Validation, got {other:?}"),
        }
        match account
            .register("Bo", "not-an-email", Role::Client, Uuid::new_v4(), &clock)
            .unwrap_err()
        {
            DomainError::Validation { field, .. } => assert_eq!(field, "email"),
            other => panic!("expected Validation, got {other:?}"),
        }
        assert!(account.uncommitted_events().is_empty());
    }

    #[test]
    fn test_email_claim_id_is_stable_per_address() {
        assert_eq!(email_claim_id("a@b.c"), email_claim_id("a@b.c"));
        assert_ne!(email_claim_id("a@b.c"), email_claim_id("x@b.c"));
    }
}
