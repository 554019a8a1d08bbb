//! Event-sourced implementation of the `UserDirectory` port.

use std::sync::Arc;

use async_trait::async_trait;
use roomly_core::error::DomainError;
use roomly_core::identity::{UserDirectory, UserProfile};
use roomly_core::repository::EventRepository;
use uuid::Uuid;

use crate::application::query_handlers::find_user_profile;

/// Resolves users by replaying their identity streams.
#[derive(Clone)]
pub struct EventSourcedUserDirectory {
    repo: Arc<dyn EventRepository>,
}

impl EventSourcedUserDirectory {
    /// Creates a directory reading from `repo`.
    #[must_use]
    pub fn new(repo: Arc<dyn EventRepository>) -> Self {
        Self { repo }
    }
}

impl std::fmt::Debug for EventSourcedUserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSourcedUserDirectory").finish_non_exhaustive()
    }
}

#[async_trait]
impl UserDirectory for EventSourcedUserDirectory {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DomainError> {
        find_user_profile(user_id, self.repo.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use roomly_core::identity::{Role, UserDirectory};
    use roomly_test_support::{FixedClock, InMemoryEventRepository, fixed_now};
    use uuid::Uuid;

    use super::EventSourcedUserDirectory;
    use crate::application::command_handlers::handle_register_user;
    use crate::domain::commands::RegisterUser;

    #[tokio::test]
    async fn test_directory_finds_registered_users_only() {
        // Arrange
        let repo = Arc::new(InMemoryEventRepository::new());
        let registered = handle_register_user(
            &RegisterUser {
                correlation_id: Uuid::new_v4(),
                name: "Cy".to_owned(),
                email: "cy@example.com".to_owned(),
                role: None,
            },
            &FixedClock(fixed_now()),
            repo.as_ref(),
        )
        .await
        .unwrap();
        let directory = EventSourcedUserDirectory::new(repo);

        // Act
        let found = directory.find_user(registered.profile.id).await.unwrap();
        let missing = directory.find_user(Uuid::new_v4()).await.unwrap();

        // Assert
        assert_eq!(found.map(|p| p.role), Some(Role::Client));
        assert!(missing.is_none());
    }
}
