//! Billing HTTP adapter.

mod handlers;
mod routes;

pub use handlers::{handle_provider_webhook, health, BillingAppState, SIGNATURE_HEADER};
pub use routes::{billing_router, webhook_routes};
