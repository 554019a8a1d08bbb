//! Route modules organized by bounded context.

pub mod bookings;
pub mod health;
pub mod places;
pub mod users;
