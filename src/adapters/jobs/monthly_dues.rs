//! Periodic billing jobs.
//!
//! One daily tick drives two maintenance tasks:
//! - the monthly dues run (idempotent per member/month, so a daily
//!   cadence just means the first tick of each month does the work)
//! - retention pruning of the processed-event log
//!
//! The tick may overlap with webhook processing; both sides rely on the
//! storage-layer dedup keys, never on scheduling exclusivity.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::application::handlers::billing::RunMonthlyChargesHandler;
use crate::domain::foundation::Timestamp;
use crate::ports::ProcessedEventStore;

const TICK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Spawns the daily billing job loop.
pub fn spawn(
    handler: Arc<RunMonthlyChargesHandler>,
    processed_events: Arc<dyn ProcessedEventStore>,
    event_retention_days: i64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        // First tick fires immediately so a restarted service catches up.
        loop {
            interval.tick().await;
            run_once(&handler, processed_events.as_ref(), event_retention_days).await;
        }
    })
}

async fn run_once(
    handler: &RunMonthlyChargesHandler,
    processed_events: &dyn ProcessedEventStore,
    event_retention_days: i64,
) {
    match handler.run(Timestamp::now()).await {
        Ok(outcome) => {
            tracing::info!(
                charged = outcome.charged,
                skipped = outcome.skipped,
                errors = outcome.errors.len(),
                "Scheduled monthly dues run finished"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Scheduled monthly dues run failed");
        }
    }

    let cutoff = Timestamp::now().add_days(-event_retention_days);
    match processed_events.delete_before(cutoff).await {
        Ok(0) => {}
        Ok(deleted) => {
            tracing::info!(deleted = deleted, "Pruned processed-event log");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to prune processed-event log");
        }
    }
}
