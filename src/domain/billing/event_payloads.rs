//! Typed views of provider event payloads.
//!
//! Each struct captures only the fields the reconciliation handlers read;
//! everything else in the provider's resource JSON is ignored. Checkout
//! metadata carries the correlation keys this system wrote when the
//! session was created: `account_id`, `account_kind`, `payment_type`, and
//! `total_amount_cents` for payoff plans.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::foundation::{AccountId, Money};

use super::account::AccountKind;
use super::recurring::RecurringPaymentType;
use super::webhook_errors::WebhookError;

/// Checkout session object from `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionPayload {
    pub id: String,

    /// "payment" for one-time payments, "subscription" for plans.
    #[serde(default)]
    pub mode: String,

    #[serde(default)]
    pub customer: Option<String>,

    #[serde(default)]
    pub subscription: Option<String>,

    #[serde(default)]
    pub payment_intent: Option<String>,

    /// Total in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionPayload {
    pub fn is_payment_mode(&self) -> bool {
        self.mode == "payment"
    }

    pub fn is_subscription_mode(&self) -> bool {
        self.mode == "subscription"
    }

    /// Resolves the billable account reference from session metadata.
    pub fn account_ref(&self) -> Result<(AccountKind, AccountId), WebhookError> {
        account_ref_from_metadata(&self.metadata)
    }

    /// Resolves the recurring payment type from session metadata.
    pub fn payment_type(&self) -> Result<RecurringPaymentType, WebhookError> {
        let raw = self
            .metadata
            .get("payment_type")
            .ok_or(WebhookError::MissingMetadata("payment_type"))?;
        RecurringPaymentType::parse(raw)
            .ok_or_else(|| WebhookError::MalformedEvent(format!("unknown payment_type '{}'", raw)))
    }

    /// Payoff target from session metadata, when present.
    pub fn total_amount(&self) -> Option<Money> {
        self.metadata
            .get("total_amount_cents")
            .and_then(|v| v.parse::<i64>().ok())
            .map(Money::from_cents)
    }
}

/// Invoice object from `invoice.paid` / `invoice.payment_failed`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoicePayload {
    pub id: String,

    #[serde(default)]
    pub customer: Option<String>,

    #[serde(default)]
    pub subscription: Option<String>,

    /// Minor units settled by this invoice.
    #[serde(default)]
    pub amount_paid: i64,

    /// Minor units still due.
    #[serde(default)]
    pub amount_due: i64,

    /// Billing period start (Unix seconds).
    #[serde(default)]
    pub period_start: i64,

    /// Billing period end (Unix seconds).
    #[serde(default)]
    pub period_end: i64,
}

/// Subscription object from `customer.subscription.deleted`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPayload {
    pub id: String,

    #[serde(default)]
    pub customer: Option<String>,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Reads the `account_kind` + `account_id` correlation keys.
pub fn account_ref_from_metadata(
    metadata: &HashMap<String, String>,
) -> Result<(AccountKind, AccountId), WebhookError> {
    let kind_raw = metadata
        .get("account_kind")
        .ok_or(WebhookError::MissingMetadata("account_kind"))?;
    let kind = AccountKind::parse(kind_raw).ok_or_else(|| {
        WebhookError::MalformedEvent(format!("unknown account_kind '{}'", kind_raw))
    })?;

    let id_raw = metadata
        .get("account_id")
        .ok_or(WebhookError::MissingMetadata("account_id"))?;
    let id = id_raw
        .parse::<AccountId>()
        .map_err(|_| WebhookError::MalformedEvent(format!("invalid account_id '{}'", id_raw)))?;

    Ok((kind, id))
}
