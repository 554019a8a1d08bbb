//! Roomly — Cascade Coordinator.
//!
//! Deleting a place removes every booking that references it. Both sides
//! are written in a single atomic batch: either the place and all of its
//! bookings disappear, or nothing changes.

pub mod application;
pub mod domain;
