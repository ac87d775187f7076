//! Billing policy configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Billing policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Standard monthly membership dues in minor units. Zero disables
    /// the monthly dues run entirely.
    #[serde(default)]
    pub monthly_dues_cents: i64,

    /// ISO currency code for display purposes.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Days to keep processed-event records before pruning.
    #[serde(default = "default_event_retention_days")]
    pub event_retention_days: i64,
}

impl BillingConfig {
    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.monthly_dues_cents < 0 {
            return Err(ValidationError::NegativeMonthlyDues);
        }
        if self.event_retention_days < 1 {
            return Err(ValidationError::InvalidEventRetention);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            monthly_dues_cents: 0,
            currency: default_currency(),
            event_retention_days: default_event_retention_days(),
        }
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_event_retention_days() -> i64 {
    90
}
