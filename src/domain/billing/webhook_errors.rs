//! Webhook error types for provider event handling.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics. Duplicate
//! events and duplicate ledger rows are deliberately NOT represented here:
//! they are typed outcomes, absorbed silently.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header missing or verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Event timestamp is older than the acceptable window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Verified payload is not a usable event (bad JSON, missing event id).
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Required field missing from the event payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Required key missing from checkout/subscription metadata.
    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),

    /// Referenced billable account could not be resolved.
    #[error("Account not found")]
    AccountNotFound,

    /// Event was intentionally not processed (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Store operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Payment provider API call failed.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this webhook.
    ///
    /// A 5xx response is the retry signal; everything rejected before any
    /// state changed is safe for the provider to retry at its own pace,
    /// but nothing requires it to.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Storage(_)
                | WebhookError::Provider(_)
                | WebhookError::AccountNotFound // may be eventual consistency
        )
    }

    /// Maps the error to the HTTP status the webhook endpoint returns.
    ///
    /// - 400: the request itself is bad (signature, malformed body);
    ///   nothing changed, redelivery of the raw payload is safe.
    /// - 200: ignored events are acknowledged so delivery stops.
    /// - 500: transient internal failure; the provider retries with
    ///   backoff.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::MalformedEvent(_)
            | WebhookError::MissingField(_)
            | WebhookError::MissingMetadata(_) => StatusCode::BAD_REQUEST,

            WebhookError::Ignored(_) => StatusCode::OK,

            WebhookError::AccountNotFound
            | WebhookError::Storage(_)
            | WebhookError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Storage(err.to_string())
    }
}
