//! Commands: intent submitted to a bounded context on behalf of a caller.

use uuid::Uuid;

/// A request to change state.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable `"<context>.<verb>"` name, e.g. `"bookings.create_booking"`.
    fn command_type(&self) -> &'static str;

    /// Copied onto every event the command produces.
    fn correlation_id(&self) -> Uuid;
}
