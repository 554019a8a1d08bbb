//! Test user directory.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use roomly_core::error::DomainError;
use roomly_core::identity::{Role, UserDirectory, UserProfile};
use uuid::Uuid;

/// A user directory backed by a fixed map of profiles.
#[derive(Debug, Default)]
pub struct StaticUserDirectory {
    users: Mutex<HashMap<Uuid, UserProfile>>,
}

impl StaticUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and returns its generated id.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add(&self, name: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        let profile = UserProfile {
            id,
            name: name.to_owned(),
            email: format!("{}@example.com", name.to_ascii_lowercase()),
            role,
        };
        self.users.lock().unwrap().insert(id, profile);
        id
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DomainError> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }
}
