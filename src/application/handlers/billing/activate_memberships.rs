//! ActivateMembershipsHandler - bulk membership activation.
//!
//! Used by operators to flip a batch of members active (start of a season,
//! import from a roster). Partial failure collects per-member errors and
//! returns an aggregate result instead of failing the batch.

use std::sync::Arc;

use crate::domain::billing::AccountKind;
use crate::domain::foundation::{AccountId, DomainError};
use crate::ports::AccountStore;

/// One member that could not be activated.
#[derive(Debug, Clone)]
pub struct ActivationError {
    pub account_id: AccountId,
    pub message: String,
}

/// Aggregate result of a bulk activation.
#[derive(Debug, Clone, Default)]
pub struct ActivationOutcome {
    pub activated: u32,
    pub errors: Vec<ActivationError>,
}

/// Handler for bulk membership activation.
pub struct ActivateMembershipsHandler {
    accounts: Arc<dyn AccountStore>,
}

impl ActivateMembershipsHandler {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    pub async fn run(&self, member_ids: &[AccountId]) -> Result<ActivationOutcome, DomainError> {
        let mut outcome = ActivationOutcome::default();

        for id in member_ids {
            match self.activate_one(id).await {
                Ok(()) => outcome.activated += 1,
                Err(e) => {
                    tracing::warn!(account_id = %id, error = %e, "Failed to activate membership");
                    outcome.errors.push(ActivationError {
                        account_id: *id,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            activated = outcome.activated,
            errors = outcome.errors.len(),
            "Bulk membership activation complete"
        );

        Ok(outcome)
    }

    async fn activate_one(&self, id: &AccountId) -> Result<(), DomainError> {
        let mut account = self
            .accounts
            .find_by_id(AccountKind::Member, id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    crate::domain::foundation::ErrorCode::AccountNotFound,
                    format!("No member account with id {}", id),
                )
            })?;

        account.activate_membership()?;
        self.accounts.update(&account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAccountStore;
    use crate::domain::billing::Account;

    #[tokio::test]
    async fn activates_all_resolvable_members() {
        let store = Arc::new(InMemoryAccountStore::new());
        let a = Account::member(AccountId::new(), "A", "a@example.com");
        let b = Account::member(AccountId::new(), "B", "b@example.com");
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();

        let handler = ActivateMembershipsHandler::new(store.clone());
        let outcome = handler.run(&[a.id, b.id]).await.unwrap();

        assert_eq!(outcome.activated, 2);
        assert!(outcome.errors.is_empty());
        for id in [a.id, b.id] {
            assert!(store
                .find_by_id(AccountKind::Member, &id)
                .await
                .unwrap()
                .unwrap()
                .membership_active);
        }
    }

    #[tokio::test]
    async fn missing_members_become_per_item_errors() {
        let store = Arc::new(InMemoryAccountStore::new());
        let present = Account::member(AccountId::new(), "Present", "p@example.com");
        store.insert(&present).await.unwrap();
        let missing = AccountId::new();

        let handler = ActivateMembershipsHandler::new(store);
        let outcome = handler.run(&[present.id, missing]).await.unwrap();

        assert_eq!(outcome.activated, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].account_id, missing);
    }
}
