//! Event repository abstraction.

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;

/// Stored representation of a domain event.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

impl StoredEvent {
    /// Converts a domain event into its stored representation.
    pub fn from_event<E: DomainEvent>(event: &E) -> Self {
        let meta = event.metadata();
        Self {
            event_id: meta.event_id,
            aggregate_id: meta.aggregate_id,
            event_type: event.event_type().to_owned(),
            payload: event.to_payload(),
            sequence_number: meta.sequence_number,
            correlation_id: meta.correlation_id,
            causation_id: meta.causation_id,
            occurred_at: meta.occurred_at,
        }
    }
}

/// Events destined for one stream inside an atomic batch.
#[derive(Debug, Clone)]
pub struct StreamAppend {
    /// Target stream.
    pub aggregate_id: Uuid,
    /// Last sequence number the writer observed on the stream.
    pub expected_version: i64,
    /// Events to append, in sequence order.
    pub events: Vec<StoredEvent>,
}

impl StreamAppend {
    /// Builds a stream append from an aggregate's uncommitted events.
    pub fn from_events<E: DomainEvent>(aggregate_id: Uuid, expected_version: i64, events: &[E]) -> Self {
        Self {
            aggregate_id,
            expected_version,
            events: events.iter().map(StoredEvent::from_event).collect(),
        }
    }
}

/// Repository trait for loading and appending domain events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Load all events for a given aggregate, ordered by sequence number.
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append new events to an aggregate stream with optimistic concurrency.
    /// `expected_version` is the last known sequence number.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;

    /// Append to several streams as one all-or-nothing unit. Every stream's
    /// `expected_version` is checked; if any check or write fails nothing is
    /// persisted.
    async fn append_batch(&self, batch: &[StreamAppend]) -> Result<(), DomainError>;

    /// Load every event whose type belongs to `category` (the prefix before
    /// the first `.`), ordered by occurrence and then sequence number.
    async fn load_category(&self, category: &str) -> Result<Vec<StoredEvent>, DomainError>;
}

/// Splits a flat list of events into per-aggregate streams, each sorted by
/// sequence number.
#[must_use]
pub fn group_streams(events: Vec<StoredEvent>) -> BTreeMap<Uuid, Vec<StoredEvent>> {
    let mut streams: BTreeMap<Uuid, Vec<StoredEvent>> = BTreeMap::new();
    for event in events {
        streams.entry(event.aggregate_id).or_default().push(event);
    }
    for stream in streams.values_mut() {
        stream.sort_by_key(|e| e.sequence_number);
    }
    streams
}
