//! Provider webhook event envelope.
//!
//! Only the fields this engine needs are captured; the event-specific
//! object is kept as raw JSON and deserialized by the handler that knows
//! its shape.

use serde::{Deserialize, Serialize};

/// A webhook event from the payment processor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEvent {
    /// Stable event identifier; the global idempotency key.
    pub id: String,

    /// Dotted event type string (e.g. "invoice.paid").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event was created at the processor (Unix seconds).
    pub created: i64,

    /// Event-specific payload.
    pub data: ProviderEventData,

    /// Whether this is a live mode event.
    #[serde(default)]
    pub livemode: bool,
}

/// Container for the event-specific object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEventData {
    /// The resource that triggered the event; shape depends on the type.
    pub object: serde_json::Value,
}

impl ProviderEvent {
    /// Parses the event type into a known kind.
    pub fn kind(&self) -> ProviderEventKind {
        ProviderEventKind::parse(&self.event_type)
    }

    /// Deserializes the data object as the given payload type.
    pub fn object_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Event kinds this engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEventKind {
    /// Checkout session finished (subscription start or one-time payment).
    CheckoutSessionCompleted,
    /// Invoice settled successfully.
    InvoicePaid,
    /// Invoice payment attempt failed.
    InvoicePaymentFailed,
    /// Processor-side subscription termination.
    SubscriptionDeleted,
    /// Anything else; acknowledged without processing.
    Unknown,
}

impl ProviderEventKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "invoice.paid" => Self::InvoicePaid,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::InvoicePaid => "invoice.paid",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::Unknown => "unknown",
        }
    }
}

/// Builder for creating test ProviderEvent instances.
#[cfg(test)]
pub struct ProviderEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    livemode: bool,
}

#[cfg(test)]
impl Default for ProviderEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_1".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: 1_704_067_200,
            object: serde_json::json!({}),
            livemode: false,
        }
    }
}

#[cfg(test)]
impl ProviderEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> ProviderEvent {
        ProviderEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: ProviderEventData {
                object: self.object,
            },
            livemode: self.livemode,
        }
    }
}
