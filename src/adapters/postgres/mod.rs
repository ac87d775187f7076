//! PostgreSQL store adapters.

mod account_store;
mod ledger_store;
mod processed_event_store;
mod recurring_payment_store;

pub use account_store::PostgresAccountStore;
pub use ledger_store::PostgresLedgerStore;
pub use processed_event_store::PostgresProcessedEventStore;
pub use recurring_payment_store::PostgresRecurringPaymentStore;
