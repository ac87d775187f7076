//! Axum handlers for the billing HTTP surface.
//!
//! The webhook endpoint takes the raw body bytes: signature verification
//! needs the exact bytes the provider signed, so the payload must never
//! pass through a JSON extractor first.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::application::handlers::billing::{
    HandleProviderWebhookCommand, ProviderWebhookHandler,
};
use crate::domain::billing::WebhookError;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Provider-Signature";

/// Shared state for the billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub webhook_handler: Arc<ProviderWebhookHandler>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

/// POST /webhooks/provider
///
/// Response contract:
/// - `200 {"received":true}` on success
/// - `200 {"received":true,"duplicate":true}` on detected replay
/// - `400` with a plain-text reason on signature/body failure
/// - `500 {"message":...}` on internal failure
pub async fn handle_provider_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return webhook_error_response(WebhookError::InvalidSignature);
    };

    let cmd = HandleProviderWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    match state.webhook_handler.handle(cmd).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => webhook_error_response(e),
    }
}

fn webhook_error_response(error: WebhookError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(error = %error, "Webhook processing failed");
        (
            status,
            Json(ErrorBody {
                message: error.to_string(),
            }),
        )
            .into_response()
    } else {
        tracing::warn!(error = %error, "Webhook rejected");
        (status, error.to_string()).into_response()
    }
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryAccountStore, InMemoryLedgerStore, InMemoryProcessedEventStore,
        InMemoryRecurringPaymentStore,
    };
    use crate::application::handlers::billing::ReconciliationDispatcher;
    use crate::domain::billing::{BalanceReconciler, LedgerWriter, WebhookVerifier};
    use crate::ports::{PaymentProviderClient, ProviderError, ProviderInvoice, ProviderSubscription};
    use async_trait::async_trait;
    use secrecy::SecretString;

    const SECRET: &str = "whsec_http_tests";

    struct NullProviderClient;

    #[async_trait]
    impl PaymentProviderClient for NullProviderClient {
        async fn retrieve_subscription(
            &self,
            subscription_id: &str,
        ) -> Result<ProviderSubscription, ProviderError> {
            Err(ProviderError::NotFound(subscription_id.to_string()))
        }

        async fn retrieve_invoice(
            &self,
            invoice_id: &str,
        ) -> Result<ProviderInvoice, ProviderError> {
            Err(ProviderError::NotFound(invoice_id.to_string()))
        }

        async fn cancel_subscription(&self, _subscription_id: &str) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn state() -> BillingAppState {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let writer = LedgerWriter::new(
            Arc::new(InMemoryLedgerStore::new()),
            BalanceReconciler::new(accounts.clone()),
        );
        let dispatcher = ReconciliationDispatcher::new(
            accounts,
            Arc::new(InMemoryRecurringPaymentStore::new()),
            writer,
            Arc::new(NullProviderClient),
        );
        BillingAppState {
            webhook_handler: Arc::new(ProviderWebhookHandler::new(
                WebhookVerifier::new(SecretString::new(SECRET.to_string())),
                Arc::new(InMemoryProcessedEventStore::new()),
                dispatcher,
            )),
        }
    }

    fn signed_event_body(event_id: &str) -> (Bytes, HeaderMap) {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let payload = serde_json::json!({
            "id": event_id,
            "type": "customer.created",
            "created": chrono::Utc::now().timestamp(),
            "data": {"object": {}},
            "livemode": false
        })
        .to_string();

        let timestamp = chrono::Utc::now().timestamp();
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload.as_bytes());
        let header_value = format!(
            "t={},v1={}",
            timestamp,
            hex::encode(mac.finalize().into_bytes())
        );

        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, header_value.parse().unwrap());
        (Bytes::from(payload), headers)
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn valid_event_returns_received_true() {
        let (body, headers) = signed_event_body("evt_http_1");
        let response = handle_provider_webhook(State(state()), headers, body).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"received":true}"#);
    }

    #[tokio::test]
    async fn replayed_event_returns_duplicate_true() {
        let state = state();
        let (body, headers) = signed_event_body("evt_http_dup");

        handle_provider_webhook(State(state.clone()), headers.clone(), body.clone()).await;
        let response = handle_provider_webhook(State(state), headers, body).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            r#"{"received":true,"duplicate":true}"#
        );
    }

    #[tokio::test]
    async fn missing_signature_header_returns_bad_request() {
        let (body, _) = signed_event_body("evt_http_nosig");
        let response =
            handle_provider_webhook(State(state()), HeaderMap::new(), body).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "Invalid signature");
    }

    #[tokio::test]
    async fn bad_signature_returns_bad_request_plain_text() {
        let (body, _) = signed_event_body("evt_http_badsig");
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            format!("t={},v1={}", chrono::Utc::now().timestamp(), "00".repeat(32))
                .parse()
                .unwrap(),
        );

        let response = handle_provider_webhook(State(state()), headers, body).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
