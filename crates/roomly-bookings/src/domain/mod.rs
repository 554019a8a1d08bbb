//! Domain layer for the Booking Ledger.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod values;
