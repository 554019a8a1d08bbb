//! Domain layer for the Cascade Coordinator.

pub mod commands;
