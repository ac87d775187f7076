//! In-memory RecurringPaymentStore.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{AccountKind, RecurringPayment};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::{RecurringPaymentStore, UpsertOutcome};

/// In-memory implementation of the RecurringPaymentStore port, keyed by
/// provider subscription id.
#[derive(Default)]
pub struct InMemoryRecurringPaymentStore {
    plans: RwLock<HashMap<String, RecurringPayment>>,
}

impl InMemoryRecurringPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecurringPaymentStore for InMemoryRecurringPaymentStore {
    async fn upsert_by_subscription_id(
        &self,
        plan: &RecurringPayment,
    ) -> Result<UpsertOutcome, DomainError> {
        let mut plans = self.plans.write().await;
        let key = plan.provider_subscription_id.clone();
        match plans.get_mut(&key) {
            Some(existing) => {
                // A replayed creation refreshes the benign fields only;
                // payoff progress and termination state are never reset.
                existing.amount_per_month = plan.amount_per_month;
                existing.start_date = plan.start_date;
                existing.next_charge_date = plan.next_charge_date;
                existing.updated_at = plan.updated_at;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                plans.insert(key, plan.clone());
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<RecurringPayment>, DomainError> {
        Ok(self.plans.read().await.get(subscription_id).cloned())
    }

    async fn update(&self, plan: &RecurringPayment) -> Result<(), DomainError> {
        let mut plans = self.plans.write().await;
        match plans.get_mut(&plan.provider_subscription_id) {
            Some(existing) if existing.id == plan.id => {
                *existing = plan.clone();
                Ok(())
            }
            _ => Err(DomainError::new(
                ErrorCode::RecurringPaymentNotFound,
                format!("No recurring payment with id {}", plan.id),
            )),
        }
    }

    async fn list_active_for_account(
        &self,
        kind: AccountKind,
        account_id: &AccountId,
    ) -> Result<Vec<RecurringPayment>, DomainError> {
        Ok(self
            .plans
            .read()
            .await
            .values()
            .filter(|p| p.account_kind == kind && p.account_id == *account_id && p.is_active)
            .cloned()
            .collect())
    }
}
