//! Roomly Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that all bounded
//! contexts depend on: aggregates, events, commands, the event repository
//! port, the domain error taxonomy and the resolved identity of the acting
//! principal. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod identity;
pub mod repository;
