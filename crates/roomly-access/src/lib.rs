//! Roomly — Authorization Engine.
//!
//! A pure decision table over `(caller, action)`. Every mutating operation
//! in the place and booking contexts asks this crate first; nothing here
//! touches storage.

pub mod policy;

pub use policy::{Action, Decision, Grant, StatusChange, authorize, decide, require_authenticated};
