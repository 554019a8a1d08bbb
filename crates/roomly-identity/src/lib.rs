//! Roomly — Identity bounded context.
//!
//! Registers users with an immutable role and answers profile lookups for
//! the rest of the system through [`application::directory`].

pub mod application;
pub mod domain;
