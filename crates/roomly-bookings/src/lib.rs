//! Roomly — Booking Ledger bounded context.
//!
//! Owns reservation requests against places and the status state machine
//! (`pending` → `approved` | `rejected`). Every mutation is checked by
//! `roomly-access` before the state machine runs.

pub mod application;
pub mod domain;
