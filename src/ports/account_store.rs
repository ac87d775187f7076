//! AccountStore port - persistence for billable accounts.
//!
//! Balance mutations flow through the balance reconciler, which reads the
//! account, applies a delta, and writes it back via `update`. The store
//! does not promise serializability across calls; the derived balance is
//! re-derivable from the ledger if a crash lands between a transaction
//! write and its balance update.

use async_trait::async_trait;

use crate::domain::billing::{Account, AccountKind};
use crate::domain::foundation::{AccountId, DomainError};

/// Port for storing and retrieving billable accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Finds an account by kind and id.
    async fn find_by_id(
        &self,
        kind: AccountKind,
        id: &AccountId,
    ) -> Result<Option<Account>, DomainError>;

    /// Finds the account owning a processor customer id.
    async fn find_by_customer_id(&self, customer_id: &str)
        -> Result<Option<Account>, DomainError>;

    /// Lists members with an active membership, for the monthly dues run.
    async fn list_active_members(&self) -> Result<Vec<Account>, DomainError>;

    /// Inserts a new account.
    async fn insert(&self, account: &Account) -> Result<(), DomainError>;

    /// Writes back a mutated account.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if the id does not resolve.
    async fn update(&self, account: &Account) -> Result<(), DomainError>;
}
