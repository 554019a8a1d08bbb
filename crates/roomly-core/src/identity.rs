//! Identity of the acting principal.
//!
//! Authentication itself happens outside the core; by the time a command
//! reaches a bounded context the caller has been resolved into a [`Caller`].

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Account role. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Lists and manages places.
    Host,
    /// Requests bookings.
    Client,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(Self::Host),
            "client" => Ok(Self::Client),
            other => Err(DomainError::validation(
                "role",
                format!("unknown role `{other}`, expected host or client"),
            )),
        }
    }
}

/// An authenticated user together with their role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// The user identifier.
    pub user_id: Uuid,
    /// The user's role.
    pub role: Role,
}

impl Actor {
    /// Creates a host actor.
    #[must_use]
    pub fn host(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Host,
        }
    }

    /// Creates a client actor.
    #[must_use]
    pub fn client(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Client,
        }
    }
}

/// Whoever issued a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// No identity could be resolved.
    Anonymous,
    /// A resolved identity.
    Authenticated(Actor),
}

impl Caller {
    /// Returns the resolved actor, if any.
    #[must_use]
    pub fn actor(&self) -> Option<&Actor> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(actor) => Some(actor),
        }
    }
}

impl From<Actor> for Caller {
    fn from(actor: Actor) -> Self {
        Self::Authenticated(actor)
    }
}

/// Public profile of a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Account role.
    pub role: Role,
}

impl UserProfile {
    /// The actor this profile authenticates as.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            role: self.role,
        }
    }
}

/// Lookup port for registered users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the profile of `user_id`, or `None` if no such user exists.
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parses_case_insensitively() {
        assert_eq!("Host".parse::<Role>().unwrap(), Role::Host);
        assert_eq!(" client ".parse::<Role>().unwrap(), Role::Client);
    }

    #[test]
    fn test_role_rejects_unknown_value() {
        match "admin".parse::<Role>().unwrap_err() {
            DomainError::Validation { field, .. } => assert_eq!(field, "role"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_anonymous_caller_has_no_actor() {
        assert!(Caller::Anonymous.actor().is_none());
        let actor = Actor::host(Uuid::new_v4());
        assert_eq!(Caller::from(actor).actor(), Some(&actor));
    }
}
