//! In-memory ProcessedEventStore.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{InsertOutcome, ProcessedEvent, ProcessedEventStore, ProcessingResult};

/// In-memory implementation of the ProcessedEventStore port.
#[derive(Default)]
pub struct InMemoryProcessedEventStore {
    events: RwLock<HashMap<String, ProcessedEvent>>,
}

impl InMemoryProcessedEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessedEventStore for InMemoryProcessedEventStore {
    async fn record(&self, event: ProcessedEvent) -> Result<InsertOutcome, DomainError> {
        let mut events = self.events.write().await;
        if events.contains_key(&event.event_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        events.insert(event.event_id.clone(), event);
        Ok(InsertOutcome::Inserted)
    }

    async fn mark_result(
        &self,
        event_id: &str,
        result: ProcessingResult,
        error_message: Option<&str>,
    ) -> Result<(), DomainError> {
        let mut events = self.events.write().await;
        if let Some(event) = events.get_mut(event_id) {
            event.result = result;
            event.error_message = error_message.map(String::from);
        }
        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError> {
        Ok(self.events.read().await.get(event_id).cloned())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|_, e| !e.received_at.is_before(&cutoff));
        Ok((before - events.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_detects_duplicates() {
        let store = InMemoryProcessedEventStore::new();
        let outcome1 = store
            .record(ProcessedEvent::received("evt_1", "invoice.paid"))
            .await
            .unwrap();
        let outcome2 = store
            .record(ProcessedEvent::received("evt_1", "invoice.paid"))
            .await
            .unwrap();

        assert_eq!(outcome1, InsertOutcome::Inserted);
        assert_eq!(outcome2, InsertOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn mark_result_updates_the_record() {
        let store = InMemoryProcessedEventStore::new();
        store
            .record(ProcessedEvent::received("evt_2", "invoice.paid"))
            .await
            .unwrap();
        store
            .mark_result("evt_2", ProcessingResult::Failed, Some("boom"))
            .await
            .unwrap();

        let record = store.find("evt_2").await.unwrap().unwrap();
        assert_eq!(record.result, ProcessingResult::Failed);
        assert_eq!(record.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn delete_before_prunes_old_records() {
        let store = InMemoryProcessedEventStore::new();
        let mut old = ProcessedEvent::received("evt_old", "invoice.paid");
        old.received_at = Timestamp::now().add_days(-120);
        store.record(old).await.unwrap();
        store
            .record(ProcessedEvent::received("evt_new", "invoice.paid"))
            .await
            .unwrap();

        let deleted = store
            .delete_before(Timestamp::now().add_days(-90))
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert!(store.find("evt_old").await.unwrap().is_none());
        assert!(store.find("evt_new").await.unwrap().is_some());
    }
}
