//! Test repositories — `EventRepository` implementations for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use roomly_core::error::DomainError;
use roomly_core::event::category_of;
use roomly_core::repository::{EventRepository, StoredEvent, StreamAppend};
use uuid::Uuid;

/// A fully working event store held in memory.
///
/// Honours expected versions the same way the PostgreSQL store does and
/// applies batches under a single lock, so batch appends are atomic. A batch
/// failure can be injected with [`InMemoryEventRepository::fail_next_batch`]
/// to exercise rollback paths.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: Mutex<Vec<StoredEvent>>,
    fail_next_batch: AtomicBool,
}

impl InMemoryEventRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `append_batch` call fail with an infrastructure error
    /// after its version checks pass, leaving the store untouched.
    pub fn fail_next_batch(&self) {
        self.fail_next_batch.store(true, Ordering::SeqCst);
    }

    /// Returns a snapshot of every stored event in append order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn all_events(&self) -> Vec<StoredEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the number of events stored for `aggregate_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stream_len(&self, aggregate_id: Uuid) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .count()
    }

    fn current_version(events: &[StoredEvent], aggregate_id: Uuid) -> i64 {
        events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.sequence_number)
            .max()
            .unwrap_or(0)
    }

    fn check(events: &[StoredEvent], append: &StreamAppend) -> Result<(), DomainError> {
        let actual = Self::current_version(events, append.aggregate_id);
        if actual != append.expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: append.aggregate_id,
                expected: append.expected_version,
                actual,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let mut stream: Vec<StoredEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        stream.sort_by_key(|e| e.sequence_number);
        Ok(stream)
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut stored = self.events.lock().unwrap();
        let append = StreamAppend {
            aggregate_id,
            expected_version,
            events: events.to_vec(),
        };
        Self::check(&stored, &append)?;
        stored.extend(append.events);
        Ok(())
    }

    async fn append_batch(&self, batch: &[StreamAppend]) -> Result<(), DomainError> {
        let mut stored = self.events.lock().unwrap();
        for append in batch {
            Self::check(&stored, append)?;
        }
        if self.fail_next_batch.swap(false, Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("injected batch failure".into()));
        }
        for append in batch {
            stored.extend(append.events.iter().cloned());
        }
        Ok(())
    }

    async fn load_category(&self, category: &str) -> Result<Vec<StoredEvent>, DomainError> {
        let mut matching: Vec<StoredEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| category_of(&e.event_type) == category)
            .cloned()
            .collect();
        matching.sort_by_key(|e| (e.occurred_at, e.sequence_number));
        Ok(matching)
    }
}

/// An event repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_batch(&self, _batch: &[StreamAppend]) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load_category(&self, _category: &str) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
