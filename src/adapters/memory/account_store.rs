//! In-memory AccountStore.
//!
//! Backs unit and integration tests, and the local development mode that
//! runs without Postgres. Mirrors the uniqueness semantics of the
//! Postgres adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{Account, AccountKind};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::AccountStore;

/// In-memory implementation of the AccountStore port.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<(AccountKind, AccountId), Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_id(
        &self,
        kind: AccountKind,
        id: &AccountId,
    ) -> Result<Option<Account>, DomainError> {
        Ok(self.accounts.read().await.get(&(kind, *id)).cloned())
    }

    async fn find_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Account>, DomainError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.provider_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn list_active_members(&self) -> Result<Vec<Account>, DomainError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .filter(|a| a.kind == AccountKind::Member && a.membership_active)
            .cloned()
            .collect())
    }

    async fn insert(&self, account: &Account) -> Result<(), DomainError> {
        let mut accounts = self.accounts.write().await;
        let key = (account.kind, account.id);
        if accounts.contains_key(&key) {
            return Err(DomainError::new(
                ErrorCode::DuplicateKey,
                format!("Account {} already exists", account.id),
            ));
        }
        accounts.insert(key, account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<(), DomainError> {
        let mut accounts = self.accounts.write().await;
        let key = (account.kind, account.id);
        match accounts.get_mut(&key) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::AccountNotFound,
                format!("No {} account with id {}", account.kind, account.id),
            )),
        }
    }
}
