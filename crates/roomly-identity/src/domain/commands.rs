//! Commands for the Identity context.

use roomly_core::command::Command;
use roomly_core::identity::Role;
use uuid::Uuid;

/// Command to register a new user.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email, unique across users.
    pub email: String,
    /// Requested role; clients when omitted.
    pub role: Option<Role>,
}

impl Command for RegisterUser {
    fn command_type(&self) -> &'static str {
        "identity.register_user"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
