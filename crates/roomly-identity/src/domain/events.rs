//! Domain events for the Identity context.

use roomly_core::event::{DomainEvent, EventMetadata};
use roomly_core::identity::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted on the user's own stream when the account is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegistered {
    /// The user identifier.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Normalized (trimmed, lowercase) email.
    pub email: String,
    /// Account role.
    pub role: Role,
}

/// Emitted on the email's claim stream so no second account can take it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailClaimed {
    /// Normalized email.
    pub email: String,
    /// The account holding the email.
    pub user_id: Uuid,
}

/// Category shared by every identity event type.
pub const IDENTITY_EVENT_CATEGORY: &str = "identity";

/// Event type identifier for [`UserRegistered`].
pub const USER_REGISTERED_EVENT_TYPE: &str = "identity.user_registered";

/// Event type identifier for [`EmailClaimed`].
pub const EMAIL_CLAIMED_EVENT_TYPE: &str = "identity.email_claimed";

/// Event payload variants for the Identity context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IdentityEventKind {
    /// A user has registered.
    UserRegistered(UserRegistered),
    /// An email address has been claimed.
    EmailClaimed(EmailClaimed),
}

/// Domain event envelope for the Identity context.
#[derive(Debug, Clone)]
pub struct IdentityEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: IdentityEventKind,
}

impl DomainEvent for IdentityEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            IdentityEventKind::UserRegistered(_) => USER_REGISTERED_EVENT_TYPE,
            IdentityEventKind::EmailClaimed(_) => EMAIL_CLAIMED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).unwrap_or(serde_json::Value::Null)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
