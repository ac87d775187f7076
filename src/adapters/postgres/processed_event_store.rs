//! PostgreSQL implementation of the ProcessedEventStore port.
//!
//! The PRIMARY KEY on `event_id` is the idempotency guard; the insert
//! races resolve at the database, never in process memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{InsertOutcome, ProcessedEvent, ProcessedEventStore, ProcessingResult};

/// PostgreSQL-backed processed-event log.
pub struct PostgresProcessedEventStore {
    pool: PgPool,
}

impl PostgresProcessedEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProcessedEventRow {
    event_id: String,
    event_type: String,
    received_at: DateTime<Utc>,
    result: String,
    error_message: Option<String>,
}

impl TryFrom<ProcessedEventRow> for ProcessedEvent {
    type Error = DomainError;

    fn try_from(row: ProcessedEventRow) -> Result<Self, Self::Error> {
        let result = ProcessingResult::parse(&row.result).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid processing result value: {}", row.result),
            )
        })?;

        Ok(ProcessedEvent {
            event_id: row.event_id,
            event_type: row.event_type,
            received_at: Timestamp::from_datetime(row.received_at),
            result,
            error_message: row.error_message,
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl ProcessedEventStore for PostgresProcessedEventStore {
    async fn record(&self, event: ProcessedEvent) -> Result<InsertOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, event_type, received_at, result, error_message)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&event.event_id)
        .bind(&event.event_type)
        .bind(event.received_at.as_datetime())
        .bind(event.result.as_str())
        .bind(&event.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record processed event", e))?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn mark_result(
        &self,
        event_id: &str,
        result: ProcessingResult,
        error_message: Option<&str>,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE processed_events SET result = $2, error_message = $3 WHERE event_id = $1",
        )
        .bind(event_id)
        .bind(result.as_str())
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update processed event", e))?;

        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError> {
        let row = sqlx::query_as::<_, ProcessedEventRow>(
            "SELECT * FROM processed_events WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find processed event", e))?;

        row.map(ProcessedEvent::try_from).transpose()
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM processed_events WHERE received_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to prune processed events", e))?;

        Ok(result.rows_affected())
    }
}
