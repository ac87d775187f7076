//! LedgerStore port - persistence for ledger transactions.
//!
//! Uniqueness is the store's contract, not the caller's: inserts that
//! collide on a dedup key — (provider invoice id, entry type), provider
//! payment id, or monthly key — resolve to `AlreadyExists` instead of an
//! error, so duplicate deliveries become no-ops.

use async_trait::async_trait;

use crate::domain::billing::{AccountKind, LedgerEntryType, Transaction};
use crate::domain::foundation::{AccountId, DomainError, TransactionId};

use super::processed_event_store::InsertOutcome;

/// Port for the append-mostly transaction ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts a transaction.
    ///
    /// Returns `AlreadyExists` when the entry collides with an existing
    /// row on any dedup key; the ledger is unchanged in that case.
    async fn insert(&self, transaction: &Transaction) -> Result<InsertOutcome, DomainError>;

    /// Finds the entry recorded for a (provider invoice id, entry type)
    /// pair, if any.
    async fn find_by_invoice(
        &self,
        invoice_id: &str,
        entry: LedgerEntryType,
    ) -> Result<Option<Transaction>, DomainError>;

    /// Finds the entry recorded under a monthly-dues key, if any.
    async fn find_by_monthly_key(&self, key: &str) -> Result<Option<Transaction>, DomainError>;

    /// Lists all entries for one account, newest first.
    async fn list_for_account(
        &self,
        kind: AccountKind,
        account_id: &AccountId,
    ) -> Result<Vec<Transaction>, DomainError>;

    /// Deletes an entry, returning the removed row so the caller can
    /// reverse its balance effect.
    ///
    /// Returns `None` if no entry with that id exists.
    async fn remove(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError>;
}
