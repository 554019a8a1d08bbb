//! Commands for the Place Registry.

use roomly_core::command::Command;
use uuid::Uuid;

use super::values::PlaceDraft;

/// Command to list a new place.
#[derive(Debug, Clone)]
pub struct CreatePlace {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Submitted fields.
    pub draft: PlaceDraft,
}

impl Command for CreatePlace {
    fn command_type(&self) -> &'static str {
        "places.create_place"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to overwrite every mutable field of a place.
#[derive(Debug, Clone)]
pub struct UpdatePlace {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The place to update.
    pub place_id: Uuid,
    /// Replacement fields.
    pub draft: PlaceDraft,
}

impl Command for UpdatePlace {
    fn command_type(&self) -> &'static str {
        "places.update_place"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
