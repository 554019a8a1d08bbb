//! Application layer for the Identity context.

pub mod command_handlers;
pub mod directory;
pub mod query_handlers;
