//! Application layer for the Cascade Coordinator.

pub mod command_handlers;
