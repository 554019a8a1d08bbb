//! Roomly — PostgreSQL event store.
//!
//! Every aggregate stream lives in the single append-only `domain_events`
//! table. Optimistic concurrency is enforced twice: by comparing the
//! writer's expected version inside the transaction and by the
//! `(aggregate_id, sequence_number)` unique constraint.

pub mod migrations;
pub mod pg_event_repository;
