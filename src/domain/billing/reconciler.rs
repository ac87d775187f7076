//! Balance reconciler - the single mutation path for account balances.
//!
//! Reads the account, applies a signed delta (optionally floored at
//! zero), writes it back. This is deliberately not atomic with the
//! transaction write that produced the delta: the ledger is the source of
//! truth and the balance a derived cache, so a crash in the window leaves
//! stale data, not corruption.

use std::sync::Arc;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Money};
use crate::ports::AccountStore;

use super::account::{AccountKind, BalanceFloor};

/// Applies signed balance deltas to billable accounts.
#[derive(Clone)]
pub struct BalanceReconciler {
    accounts: Arc<dyn AccountStore>,
}

impl BalanceReconciler {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Applies `delta` to the account's balance and returns the new value.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if the account id does not resolve.
    pub async fn apply_delta(
        &self,
        kind: AccountKind,
        account_id: &AccountId,
        delta: Money,
        floor: BalanceFloor,
    ) -> Result<Money, DomainError> {
        let mut account = self
            .accounts
            .find_by_id(kind, account_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::AccountNotFound,
                    format!("No {} account with id {}", kind, account_id),
                )
            })?;

        let previous = account.balance;
        let new_balance = account.apply_balance_delta(delta, floor);
        self.accounts.update(&account).await?;

        tracing::debug!(
            account_id = %account_id,
            account_kind = %kind,
            delta = %delta,
            previous_balance = %previous,
            new_balance = %new_balance,
            "Applied balance delta"
        );

        Ok(new_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAccountStore;
    use crate::domain::billing::Account;

    async fn store_with_member(balance_cents: i64) -> (Arc<InMemoryAccountStore>, AccountId) {
        let store = Arc::new(InMemoryAccountStore::new());
        let mut account = Account::member(AccountId::new(), "Member", "m@example.com");
        account.balance = Money::from_cents(balance_cents);
        let id = account.id;
        store.insert(&account).await.unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn positive_delta_increases_balance() {
        let (store, id) = store_with_member(1000).await;
        let reconciler = BalanceReconciler::new(store.clone());

        let new_balance = reconciler
            .apply_delta(AccountKind::Member, &id, Money::from_cents(3000), BalanceFloor::None)
            .await
            .unwrap();

        assert_eq!(new_balance.cents(), 4000);
        let stored = store.find_by_id(AccountKind::Member, &id).await.unwrap().unwrap();
        assert_eq!(stored.balance.cents(), 4000);
    }

    #[tokio::test]
    async fn negative_delta_without_floor_goes_into_credit() {
        let (store, id) = store_with_member(1000).await;
        let reconciler = BalanceReconciler::new(store);

        let new_balance = reconciler
            .apply_delta(AccountKind::Member, &id, Money::from_cents(-2500), BalanceFloor::None)
            .await
            .unwrap();

        assert_eq!(new_balance.cents(), -1500);
    }

    #[tokio::test]
    async fn negative_delta_with_floor_clamps_at_zero() {
        let (store, id) = store_with_member(1000).await;
        let reconciler = BalanceReconciler::new(store);

        let new_balance = reconciler
            .apply_delta(AccountKind::Member, &id, Money::from_cents(-2500), BalanceFloor::Zero)
            .await
            .unwrap();

        assert_eq!(new_balance, Money::ZERO);
    }

    #[tokio::test]
    async fn missing_account_fails_with_account_not_found() {
        let store = Arc::new(InMemoryAccountStore::new());
        let reconciler = BalanceReconciler::new(store);

        let err = reconciler
            .apply_delta(
                AccountKind::Guest,
                &AccountId::new(),
                Money::from_cents(100),
                BalanceFloor::None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::AccountNotFound);
    }

    #[tokio::test]
    async fn kind_mismatch_does_not_resolve_account() {
        let (store, id) = store_with_member(0).await;
        let reconciler = BalanceReconciler::new(store);

        let err = reconciler
            .apply_delta(AccountKind::Guest, &id, Money::from_cents(100), BalanceFloor::None)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::AccountNotFound);
    }
}
