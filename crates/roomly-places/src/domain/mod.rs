//! Domain layer for the Place Registry.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod values;
