//! PaymentProviderClient port - outbound calls to the payment processor.
//!
//! The engine treats the processor as a capability-typed remote service:
//! it can fetch subscription and invoice resources by id and cancel
//! subscriptions. Webhook signature verification is a domain service and
//! is deliberately not part of this port.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A subscription resource at the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSubscription {
    /// Processor subscription id.
    pub id: String,

    /// Processor customer id.
    pub customer_id: String,

    /// Processor status string ("active", "canceled", ...).
    pub status: String,

    /// Metadata attached at checkout; carries the account correlation
    /// keys this system wrote.
    pub metadata: HashMap<String, String>,

    /// Current billing period start (Unix seconds).
    pub current_period_start: i64,

    /// Current billing period end (Unix seconds).
    pub current_period_end: i64,
}

/// An invoice resource at the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInvoice {
    /// Processor invoice id.
    pub id: String,

    /// Processor customer id.
    pub customer_id: String,

    /// Backing subscription, when the invoice bills one.
    pub subscription_id: Option<String>,

    /// Amount settled, in minor units.
    pub amount_paid: i64,

    /// Amount still due, in minor units.
    pub amount_due: i64,

    /// Billing period start (Unix seconds).
    pub period_start: i64,

    /// Billing period end (Unix seconds).
    pub period_end: i64,
}

/// Errors from processor API calls.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Transport-level failure reaching the API.
    #[error("provider network error: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The requested resource does not exist.
    #[error("provider resource not found: {0}")]
    NotFound(String),

    /// The API answered with a body this client could not decode.
    #[error("provider response decode error: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) => true,
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::NotFound(_) | ProviderError::Decode(_) => false,
        }
    }
}

/// Port for outbound payment processor calls.
#[async_trait]
pub trait PaymentProviderClient: Send + Sync {
    /// Fetches a subscription resource by id.
    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, ProviderError>;

    /// Fetches an invoice resource by id.
    async fn retrieve_invoice(&self, invoice_id: &str) -> Result<ProviderInvoice, ProviderError>;

    /// Cancels a subscription immediately.
    ///
    /// Callers invoking this after a durable local state change treat
    /// failure as a logged warning, not a processing error.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), ProviderError>;
}
