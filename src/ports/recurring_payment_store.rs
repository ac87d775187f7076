//! RecurringPaymentStore port - persistence for recurring payment plans.
//!
//! `provider_subscription_id` is the correlation key recovered from
//! provider metadata; at most one plan exists per subscription, enforced
//! by upsert semantics rather than caller discipline.

use async_trait::async_trait;

use crate::domain::billing::{AccountKind, RecurringPayment};
use crate::domain::foundation::{AccountId, DomainError};

/// Outcome of an upsert keyed on the provider subscription id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No plan existed for the subscription; one was created.
    Created,
    /// A plan already existed and was updated in place.
    Updated,
}

/// Port for storing and retrieving recurring payment plans.
#[async_trait]
pub trait RecurringPaymentStore: Send + Sync {
    /// Creates or updates the plan for its `provider_subscription_id`.
    ///
    /// A replayed creation event updates the existing row in place; it
    /// never produces a second plan for the same subscription.
    async fn upsert_by_subscription_id(
        &self,
        plan: &RecurringPayment,
    ) -> Result<UpsertOutcome, DomainError>;

    /// Finds the plan tracking a provider subscription.
    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<RecurringPayment>, DomainError>;

    /// Writes back a mutated plan.
    ///
    /// # Errors
    ///
    /// `RecurringPaymentNotFound` if the id does not resolve.
    async fn update(&self, plan: &RecurringPayment) -> Result<(), DomainError>;

    /// Lists active plans for one account.
    async fn list_active_for_account(
        &self,
        kind: AccountKind,
        account_id: &AccountId,
    ) -> Result<Vec<RecurringPayment>, DomainError>;
}
