//! Commands for the Cascade Coordinator.

use roomly_core::command::Command;
use uuid::Uuid;

/// Command to delete a place together with its bookings.
#[derive(Debug, Clone)]
pub struct DeletePlace {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The place to delete.
    pub place_id: Uuid,
}

impl Command for DeletePlace {
    fn command_type(&self) -> &'static str {
        "cascade.delete_place"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
