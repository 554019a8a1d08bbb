//! Application layer for the Booking Ledger.

pub mod command_handlers;
pub mod query_handlers;
