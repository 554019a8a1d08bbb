//! Application layer for the Place Registry.

pub mod command_handlers;
pub mod query_handlers;
