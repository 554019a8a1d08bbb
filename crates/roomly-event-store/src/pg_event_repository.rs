//! `PostgreSQL` implementation of the `EventRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use roomly_core::error::DomainError;
use roomly_core::repository::{EventRepository, StoredEvent, StreamAppend};

const SELECT_COLUMNS: &str = "SELECT event_id, aggregate_id, event_type, payload, \
     sequence_number, correlation_id, causation_id, occurred_at FROM domain_events";

/// PostgreSQL-backed event repository.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn stream_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(infrastructure)?;
        current_version(&mut conn, aggregate_id).await
    }

    /// Rewrites a unique violation on `(aggregate_id, sequence_number)` into
    /// the conflict a concurrent writer should see.
    async fn conflict_or(&self, err: DomainError, append: &StreamAppend) -> DomainError {
        if !matches!(err, DomainError::ConcurrencyConflict { .. }) {
            return err;
        }
        match self.stream_version(append.aggregate_id).await {
            Ok(actual) => DomainError::ConcurrencyConflict {
                aggregate_id: append.aggregate_id,
                expected: append.expected_version,
                actual,
            },
            Err(other) => other,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    aggregate_id: Uuid,
    event_type: String,
    payload: serde_json::Value,
    sequence_number: i64,
    correlation_id: Uuid,
    causation_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload,
            sequence_number: row.sequence_number,
            correlation_id: row.correlation_id,
            causation_id: row.causation_id,
            occurred_at: row.occurred_at,
        }
    }
}

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

async fn current_version(conn: &mut PgConnection, aggregate_id: Uuid) -> Result<i64, DomainError> {
    let (version,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(MAX(sequence_number), 0) FROM domain_events WHERE aggregate_id = $1",
    )
    .bind(aggregate_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(infrastructure)?;
    Ok(version)
}

/// Checks the stream's version and inserts its events on `conn`. The caller
/// owns the transaction.
async fn append_stream(conn: &mut PgConnection, append: &StreamAppend) -> Result<(), DomainError> {
    let actual = current_version(conn, append.aggregate_id).await?;
    if actual != append.expected_version {
        return Err(DomainError::ConcurrencyConflict {
            aggregate_id: append.aggregate_id,
            expected: append.expected_version,
            actual,
        });
    }

    for event in &append.events {
        sqlx::query(
            "INSERT INTO domain_events \
             (event_id, aggregate_id, event_type, payload, sequence_number, \
              correlation_id, causation_id, occurred_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.event_id)
        .bind(event.aggregate_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.sequence_number)
        .bind(event.correlation_id)
        .bind(event.causation_id)
        .bind(event.occurred_at)
        .execute(&mut *conn)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DomainError::ConcurrencyConflict {
                    aggregate_id: append.aggregate_id,
                    expected: append.expected_version,
                    actual: append.expected_version + 1,
                }
            }
            other => infrastructure(other),
        })?;
    }
    Ok(())
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE aggregate_id = $1 ORDER BY sequence_number"
        ))
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        self.append_batch(&[StreamAppend {
            aggregate_id,
            expected_version,
            events: events.to_vec(),
        }])
        .await
    }

    async fn append_batch(&self, batch: &[StreamAppend]) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        for append in batch {
            if let Err(err) = append_stream(&mut tx, append).await {
                // Dropping the transaction rolls every stream back.
                drop(tx);
                warn!(aggregate_id = %append.aggregate_id, error = %err, "event batch rejected");
                return Err(self.conflict_or(err, append).await);
            }
        }
        tx.commit().await.map_err(infrastructure)?;
        debug!(
            streams = batch.len(),
            events = batch.iter().map(|a| a.events.len()).sum::<usize>(),
            "event batch committed"
        );
        Ok(())
    }

    async fn load_category(&self, category: &str) -> Result<Vec<StoredEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE event_type LIKE $1 ORDER BY occurred_at, sequence_number"
        ))
        .bind(format!("{category}.%"))
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }
}
