//! Ports - contracts between the domain and the outside world.
//!
//! Stores follow the entity-store contract: keyed finders, `insert` with
//! a typed duplicate-key outcome, `update` failing on missing ids. The
//! payment provider port is the outbound processor capability.

mod account_store;
mod ledger_store;
mod payment_provider;
mod processed_event_store;
mod recurring_payment_store;

pub use account_store::AccountStore;
pub use ledger_store::LedgerStore;
pub use payment_provider::{
    PaymentProviderClient, ProviderError, ProviderInvoice, ProviderSubscription,
};
pub use processed_event_store::{
    InsertOutcome, ProcessedEvent, ProcessedEventStore, ProcessingResult,
};
pub use recurring_payment_store::{RecurringPaymentStore, UpsertOutcome};
