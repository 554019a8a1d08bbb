//! Roomly — Place Registry bounded context.
//!
//! Owns bookable places: creation by hosts, full-replace updates by the
//! owning host, and the read side used by browsing and by the booking
//! ledger. Deletion lives in `roomly-cascade` because it must take the
//! place's bookings down with it.

pub mod application;
pub mod domain;
