//! Billing domain - the payment-event reconciliation and ledger engine.

mod account;
mod event_gate;
mod event_payloads;
mod ledger_writer;
mod provider_event;
mod reconciler;
mod recurring;
mod transaction;
mod webhook_errors;
mod webhook_verifier;

pub use account::{Account, AccountKind, BalanceFloor};
pub use event_gate::{EventDispatcher, EventGate, WebhookAck};
pub use event_payloads::{
    account_ref_from_metadata, CheckoutSessionPayload, InvoicePayload, SubscriptionPayload,
};
pub use ledger_writer::{LedgerWriter, MonthlyPosting};
pub use provider_event::{ProviderEvent, ProviderEventData, ProviderEventKind};
pub use reconciler::BalanceReconciler;
pub use recurring::{PayoffProgress, RecurringPayment, RecurringPaymentType};
pub use transaction::{LedgerEntryType, Transaction, TransactionSource};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{SignatureHeader, WebhookVerifier};
