//! Axum router for the billing HTTP surface.
//!
//! Webhook routes are separate from anything user-facing: they carry no
//! session auth, the signature is the credential.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{handle_provider_webhook, health, BillingAppState};

/// Webhook routes, mounted at `/webhooks`.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/provider", post(handle_provider_webhook))
}

/// The complete billing router.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/webhooks", webhook_routes())
}
