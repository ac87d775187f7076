//! ProcessedEventStore port - durable tracking of handled provider events.
//!
//! The store is the global idempotency guard: existence of a record for an
//! event id means the event must not be re-applied wholesale. The insert
//! is a compare-and-insert backed by a unique constraint, not a lock:
//! concurrent deliveries of the same event race at the storage layer and
//! the loser observes `AlreadyExists`.
//!
//! Dedup state is durable on purpose. An in-memory set would forget
//! everything on restart, and the provider redelivers for days.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// How processing of a recorded event concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingResult {
    /// Claimed for processing; dispatch has not concluded yet.
    Received,
    /// Dispatched and handled.
    Processed,
    /// Acknowledged without a handler (unknown kind).
    Ignored,
    /// Handler returned an error; the provider will redeliver.
    Failed,
}

impl ProcessingResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingResult::Received => "received",
            ProcessingResult::Processed => "processed",
            ProcessingResult::Ignored => "ignored",
            ProcessingResult::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(ProcessingResult::Received),
            "processed" => Some(ProcessingResult::Processed),
            "ignored" => Some(ProcessingResult::Ignored),
            "failed" => Some(ProcessingResult::Failed),
            _ => None,
        }
    }
}

/// Record of a provider event this system has seen.
#[derive(Debug, Clone)]
pub struct ProcessedEvent {
    /// Provider event id; globally unique, the idempotency key.
    pub event_id: String,

    /// Dotted provider event type.
    pub event_type: String,

    /// When this system first saw the event.
    pub received_at: Timestamp,

    /// Outcome of processing, updated after dispatch.
    pub result: ProcessingResult,

    /// Error message when `result` is `Failed`.
    pub error_message: Option<String>,
}

impl ProcessedEvent {
    /// Creates the claim record inserted before dispatch.
    pub fn received(event_id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            received_at: Timestamp::now(),
            result: ProcessingResult::Received,
            error_message: None,
        }
    }
}

/// Outcome of a compare-and-insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// First time this key was seen.
    Inserted,
    /// The key already exists; the write was a no-op.
    AlreadyExists,
}

/// Port for the processed-event log.
///
/// Implementations must back `record` with a unique constraint on
/// `event_id` so concurrent inserts resolve to exactly one `Inserted`.
#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    /// Attempts to insert the record; `AlreadyExists` marks a replay.
    async fn record(&self, event: ProcessedEvent) -> Result<InsertOutcome, DomainError>;

    /// Updates the processing result after dispatch.
    ///
    /// Best-effort audit data; callers log failures instead of
    /// propagating them.
    async fn mark_result(
        &self,
        event_id: &str,
        result: ProcessingResult,
        error_message: Option<&str>,
    ) -> Result<(), DomainError>;

    /// Looks up a previously recorded event.
    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError>;

    /// Deletes records received before the cutoff; returns how many.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn received_record_has_received_result() {
        let record = ProcessedEvent::received("evt_1", "invoice.paid");
        assert_eq!(record.event_id, "evt_1");
        assert_eq!(record.result, ProcessingResult::Received);
        assert!(record.error_message.is_none());
    }

    #[test]
    fn processing_result_parse_roundtrips() {
        for result in [
            ProcessingResult::Received,
            ProcessingResult::Processed,
            ProcessingResult::Ignored,
            ProcessingResult::Failed,
        ] {
            assert_eq!(ProcessingResult::parse(result.as_str()), Some(result));
        }
        assert_eq!(ProcessingResult::parse("skipped"), None);
    }
}
