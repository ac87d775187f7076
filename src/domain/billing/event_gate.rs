//! Event gate - admits each provider event for processing exactly once.
//!
//! The gate claims an event by inserting its id into the processed-event
//! log BEFORE dispatching. The insert is a compare-and-insert: when two
//! deliveries of the same event race, the storage-layer unique constraint
//! picks one winner and the loser observes `AlreadyExists`.
//!
//! Replays short-circuit with a duplicate acknowledgement — except for
//! `invoice.paid` and `checkout.session.completed`, which are dispatched
//! anyway. A single economic event can surface as several provider-level
//! notifications with distinct event ids, so those handlers must be given
//! the chance to check their own finer-grained dedup key (the provider
//! invoice/payment id) instead of being suppressed wholesale here.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::ports::{InsertOutcome, ProcessedEvent, ProcessedEventStore, ProcessingResult};

use super::provider_event::{ProviderEvent, ProviderEventKind};
use super::webhook_errors::WebhookError;

/// Receives admitted events and applies their ledger/subscription effects.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    /// Handles one event.
    ///
    /// Returns `Err(WebhookError::Ignored(_))` for kinds the dispatcher
    /// acknowledges without processing.
    async fn dispatch(&self, event: &ProviderEvent) -> Result<(), WebhookError>;
}

/// Webhook acknowledgement body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    pub received: bool,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl WebhookAck {
    /// Fresh event, fully handled.
    pub fn processed() -> Self {
        Self {
            received: true,
            duplicate: false,
        }
    }

    /// Replayed event id.
    pub fn duplicate() -> Self {
        Self {
            received: true,
            duplicate: true,
        }
    }
}

/// Idempotency gate over the processed-event log.
pub struct EventGate {
    store: Arc<dyn ProcessedEventStore>,
}

impl EventGate {
    pub fn new(store: Arc<dyn ProcessedEventStore>) -> Self {
        Self { store }
    }

    /// Event kinds dispatched even on replay; their handlers carry their
    /// own dedup key.
    fn replay_passthrough(kind: ProviderEventKind) -> bool {
        matches!(
            kind,
            ProviderEventKind::InvoicePaid | ProviderEventKind::CheckoutSessionCompleted
        )
    }

    /// Admits and dispatches one verified event.
    pub async fn process(
        &self,
        event: &ProviderEvent,
        dispatcher: &dyn EventDispatcher,
    ) -> Result<WebhookAck, WebhookError> {
        let claim = ProcessedEvent::received(&event.id, &event.event_type);
        let replay = self.store.record(claim).await? == InsertOutcome::AlreadyExists;

        if replay {
            if !Self::replay_passthrough(event.kind()) {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "Replayed event suppressed"
                );
                return Ok(WebhookAck::duplicate());
            }
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Replayed event re-dispatched for invoice-level dedup"
            );
        }

        let outcome = dispatcher.dispatch(event).await;

        let (result, error_message) = match &outcome {
            Ok(()) => (ProcessingResult::Processed, None),
            Err(WebhookError::Ignored(reason)) => (ProcessingResult::Ignored, Some(reason.clone())),
            Err(e) => (ProcessingResult::Failed, Some(e.to_string())),
        };

        // Audit data only; never turns a handled event into a failure.
        if let Err(e) = self
            .store
            .mark_result(&event.id, result, error_message.as_deref())
            .await
        {
            tracing::warn!(
                event_id = %event.id,
                error = %e,
                "Failed to update processed-event audit record"
            );
        }

        match outcome {
            Ok(()) => {}
            Err(WebhookError::Ignored(reason)) => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    reason = %reason,
                    "Event acknowledged without processing"
                );
            }
            Err(e) => return Err(e),
        }

        Ok(if replay {
            WebhookAck::duplicate()
        } else {
            WebhookAck::processed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProcessedEventStore;
    use crate::domain::billing::provider_event::ProviderEventBuilder;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingDispatcher {
        calls: AtomicU32,
        response: fn() -> Result<(), WebhookError>,
    }

    impl CountingDispatcher {
        fn succeeding() -> Self {
            Self {
                calls: AtomicU32::new(0),
                response: || Ok(()),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicU32::new(0),
                response: || Err(WebhookError::Storage("simulated failure".to_string())),
            }
        }

        fn ignoring() -> Self {
            Self {
                calls: AtomicU32::new(0),
                response: || Err(WebhookError::Ignored("unhandled kind".to_string())),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventDispatcher for CountingDispatcher {
        async fn dispatch(&self, _event: &ProviderEvent) -> Result<(), WebhookError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.response)()
        }
    }

    fn gate() -> (EventGate, Arc<InMemoryProcessedEventStore>) {
        let store = Arc::new(InMemoryProcessedEventStore::new());
        (EventGate::new(store.clone()), store)
    }

    fn event(id: &str, event_type: &str) -> ProviderEvent {
        ProviderEventBuilder::new().id(id).event_type(event_type).build()
    }

    // ══════════════════════════════════════════════════════════════
    // Fresh events
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn fresh_event_is_dispatched_and_acknowledged() {
        let (gate, _) = gate();
        let dispatcher = CountingDispatcher::succeeding();

        let ack = gate
            .process(&event("evt_1", "invoice.payment_failed"), &dispatcher)
            .await
            .unwrap();

        assert_eq!(ack, WebhookAck::processed());
        assert_eq!(dispatcher.calls(), 1);
    }

    #[tokio::test]
    async fn fresh_event_is_recorded_as_processed() {
        let (gate, store) = gate();
        let dispatcher = CountingDispatcher::succeeding();

        gate.process(&event("evt_2", "invoice.paid"), &dispatcher)
            .await
            .unwrap();

        use crate::ports::ProcessedEventStore;
        let record = store.find("evt_2").await.unwrap().unwrap();
        assert_eq!(record.result, ProcessingResult::Processed);
    }

    // ══════════════════════════════════════════════════════════════
    // Replays
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn replayed_event_short_circuits_for_most_kinds() {
        let (gate, _) = gate();
        let dispatcher = CountingDispatcher::succeeding();

        let e = event("evt_dup", "customer.subscription.deleted");
        gate.process(&e, &dispatcher).await.unwrap();
        let ack = gate.process(&e, &dispatcher).await.unwrap();

        assert_eq!(ack, WebhookAck::duplicate());
        assert_eq!(dispatcher.calls(), 1);
    }

    #[tokio::test]
    async fn replayed_invoice_paid_is_still_dispatched() {
        let (gate, _) = gate();
        let dispatcher = CountingDispatcher::succeeding();

        let e = event("evt_inv", "invoice.paid");
        gate.process(&e, &dispatcher).await.unwrap();
        let ack = gate.process(&e, &dispatcher).await.unwrap();

        assert_eq!(ack, WebhookAck::duplicate());
        assert_eq!(dispatcher.calls(), 2);
    }

    #[tokio::test]
    async fn replayed_checkout_completed_is_still_dispatched() {
        let (gate, _) = gate();
        let dispatcher = CountingDispatcher::succeeding();

        let e = event("evt_cs", "checkout.session.completed");
        gate.process(&e, &dispatcher).await.unwrap();
        gate.process(&e, &dispatcher).await.unwrap();

        assert_eq!(dispatcher.calls(), 2);
    }

    // ══════════════════════════════════════════════════════════════
    // Dispatch outcomes
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn dispatch_failure_propagates_and_records_failed() {
        let (gate, store) = gate();
        let dispatcher = CountingDispatcher::failing();

        let result = gate.process(&event("evt_fail", "invoice.paid"), &dispatcher).await;

        assert!(matches!(result, Err(WebhookError::Storage(_))));
        use crate::ports::ProcessedEventStore;
        let record = store.find("evt_fail").await.unwrap().unwrap();
        assert_eq!(record.result, ProcessingResult::Failed);
        assert!(record.error_message.is_some());
    }

    #[tokio::test]
    async fn ignored_events_are_acknowledged_as_processed() {
        let (gate, store) = gate();
        let dispatcher = CountingDispatcher::ignoring();

        let ack = gate
            .process(&event("evt_ign", "customer.created"), &dispatcher)
            .await
            .unwrap();

        assert_eq!(ack, WebhookAck::processed());
        use crate::ports::ProcessedEventStore;
        let record = store.find("evt_ign").await.unwrap().unwrap();
        assert_eq!(record.result, ProcessingResult::Ignored);
    }

    // ══════════════════════════════════════════════════════════════
    // Ack serialization (§6 response contract)
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn processed_ack_omits_duplicate_field() {
        let json = serde_json::to_string(&WebhookAck::processed()).unwrap();
        assert_eq!(json, r#"{"received":true}"#);
    }

    #[test]
    fn duplicate_ack_includes_duplicate_field() {
        let json = serde_json::to_string(&WebhookAck::duplicate()).unwrap();
        assert_eq!(json, r#"{"received":true,"duplicate":true}"#);
    }
}
