//! In-memory LedgerStore.
//!
//! Enforces the same dedup keys as the Postgres schema: (provider invoice
//! id, entry type), provider payment id, and monthly key.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{AccountKind, LedgerEntryType, Transaction};
use crate::domain::foundation::{AccountId, DomainError, TransactionId};
use crate::ports::{InsertOutcome, LedgerStore};

/// In-memory implementation of the LedgerStore port.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    transactions: RwLock<Vec<Transaction>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collides(existing: &Transaction, candidate: &Transaction) -> bool {
        if let (Some(a), Some(b)) = (&existing.provider_invoice_id, &candidate.provider_invoice_id)
        {
            if a == b && existing.entry == candidate.entry {
                return true;
            }
        }
        if let (Some(a), Some(b)) = (&existing.provider_payment_id, &candidate.provider_payment_id)
        {
            if a == b {
                return true;
            }
        }
        if let (Some(a), Some(b)) = (&existing.monthly_key, &candidate.monthly_key) {
            if a == b {
                return true;
            }
        }
        false
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert(&self, transaction: &Transaction) -> Result<InsertOutcome, DomainError> {
        let mut transactions = self.transactions.write().await;
        if transactions.iter().any(|t| Self::collides(t, transaction)) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        transactions.push(transaction.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_invoice(
        &self,
        invoice_id: &str,
        entry: LedgerEntryType,
    ) -> Result<Option<Transaction>, DomainError> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .find(|t| t.provider_invoice_id.as_deref() == Some(invoice_id) && t.entry == entry)
            .cloned())
    }

    async fn find_by_monthly_key(&self, key: &str) -> Result<Option<Transaction>, DomainError> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .find(|t| t.monthly_key.as_deref() == Some(key))
            .cloned())
    }

    async fn list_for_account(
        &self,
        kind: AccountKind,
        account_id: &AccountId,
    ) -> Result<Vec<Transaction>, DomainError> {
        let mut entries: Vec<Transaction> = self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| t.account_kind == kind && t.account_id == *account_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn remove(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError> {
        let mut transactions = self.transactions.write().await;
        match transactions.iter().position(|t| t.id == *id) {
            Some(index) => Ok(Some(transactions.remove(index))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{Account, TransactionSource};
    use crate::domain::foundation::Money;
    use chrono::NaiveDate;

    fn account() -> Account {
        Account::member(AccountId::new(), "Member", "m@example.com")
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn same_invoice_and_entry_type_collide() {
        let store = InMemoryLedgerStore::new();
        let account = account();
        let charge = |_: u32| {
            Transaction::charge(
                &account,
                Money::from_cents(100),
                "Dues",
                date(),
                TransactionSource::Processor,
            )
            .with_invoice_id("in_1")
        };

        assert_eq!(store.insert(&charge(0)).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.insert(&charge(1)).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
    }

    #[tokio::test]
    async fn same_invoice_different_entry_types_coexist() {
        let store = InMemoryLedgerStore::new();
        let account = account();
        let charge = Transaction::charge(
            &account,
            Money::from_cents(100),
            "Dues",
            date(),
            TransactionSource::Processor,
        )
        .with_invoice_id("in_2");
        let payment = Transaction::payment(
            &account,
            Money::from_cents(100),
            "Dues",
            date(),
            TransactionSource::Processor,
        )
        .with_invoice_id("in_2");

        assert_eq!(store.insert(&charge).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert(&payment).await.unwrap(), InsertOutcome::Inserted);
    }

    #[tokio::test]
    async fn duplicate_payment_id_collides() {
        let store = InMemoryLedgerStore::new();
        let account = account();
        let payment = || {
            Transaction::payment(
                &account,
                Money::from_cents(2000),
                "One-time",
                date(),
                TransactionSource::Processor,
            )
            .with_payment_id("pi_1")
        };

        assert_eq!(store.insert(&payment()).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.insert(&payment()).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
    }

    #[tokio::test]
    async fn remove_returns_the_removed_row() {
        let store = InMemoryLedgerStore::new();
        let account = account();
        let tx = Transaction::charge(
            &account,
            Money::from_cents(100),
            "Dues",
            date(),
            TransactionSource::System,
        );
        store.insert(&tx).await.unwrap();

        let removed = store.remove(&tx.id).await.unwrap().unwrap();
        assert_eq!(removed.id, tx.id);
        assert!(store.remove(&tx.id).await.unwrap().is_none());
    }
}
