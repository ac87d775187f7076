//! Stripe implementation of the PaymentProviderClient port.
//!
//! Talks to the Stripe REST API with basic-auth on the secret key.
//! Only the three capabilities the reconciliation engine needs are
//! implemented: retrieve subscription, retrieve invoice, cancel
//! subscription.

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::ports::{
    PaymentProviderClient, ProviderError, ProviderInvoice, ProviderSubscription,
};

/// Stripe API client configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Stripe API.
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Overrides the API base URL (tests, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe-backed payment provider client.
pub struct StripeClient {
    config: StripeConfig,
    http: reqwest::Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        resource_id: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}/{}", self.config.api_base_url, path, resource_id);
        let response = self
            .http
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Self::decode(resource_id, response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        resource_id: &str,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(resource_id.to_string()));
        }
        if !status.is_success() {
            let message = response
                .json::<StripeErrorEnvelope>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "unreadable error body".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    id: String,
    customer: String,
    status: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    current_period_start: i64,
    #[serde(default)]
    current_period_end: i64,
}

impl From<StripeSubscription> for ProviderSubscription {
    fn from(s: StripeSubscription) -> Self {
        ProviderSubscription {
            id: s.id,
            customer_id: s.customer,
            status: s.status,
            metadata: s.metadata,
            current_period_start: s.current_period_start,
            current_period_end: s.current_period_end,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeInvoice {
    id: String,
    customer: String,
    #[serde(default)]
    subscription: Option<String>,
    #[serde(default)]
    amount_paid: i64,
    #[serde(default)]
    amount_due: i64,
    #[serde(default)]
    period_start: i64,
    #[serde(default)]
    period_end: i64,
}

impl From<StripeInvoice> for ProviderInvoice {
    fn from(i: StripeInvoice) -> Self {
        ProviderInvoice {
            id: i.id,
            customer_id: i.customer,
            subscription_id: i.subscription,
            amount_paid: i.amount_paid,
            amount_due: i.amount_due,
            period_start: i.period_start,
            period_end: i.period_end,
        }
    }
}

#[async_trait]
impl PaymentProviderClient for StripeClient {
    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, ProviderError> {
        let subscription: StripeSubscription =
            self.get("/v1/subscriptions", subscription_id).await?;
        Ok(subscription.into())
    }

    async fn retrieve_invoice(&self, invoice_id: &str) -> Result<ProviderInvoice, ProviderError> {
        let invoice: StripeInvoice = self.get("/v1/invoices", invoice_id).await?;
        Ok(invoice.into())
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), ProviderError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );
        let response = self
            .http
            .delete(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let _: StripeSubscription = Self::decode(subscription_id, response).await?;
        tracing::info!(subscription_id = %subscription_id, "Canceled Stripe subscription");
        Ok(())
    }
}
