//! Shared test doubles and utilities for the Roomly booking marketplace.

mod clock;
mod directory;
mod repository;

pub use clock::{FixedClock, fixed_now};
pub use directory::StaticUserDirectory;
pub use repository::{FailingEventRepository, InMemoryEventRepository};
