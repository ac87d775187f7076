//! Invoice ledger writer - turns processor payment facts into ledger rows.
//!
//! Every operation here is idempotent under redelivery:
//!
//! - Invoice-backed entries dedup on (provider invoice id, entry type),
//!   checked by lookup and backed by a partial unique index for the
//!   concurrent case.
//! - One-time payments carry no invoice; they dedup on the provider
//!   payment id via store-level duplicate-key rejection.
//! - Monthly dues dedup on the structured `"{account_id}:{YYYY-MM}"` key.
//!
//! The balance only moves when the deciding entry was actually created,
//! so a replay that finds its rows already present changes nothing.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::foundation::{DomainError, Money, Timestamp};
use crate::ports::{InsertOutcome, LedgerStore};

use super::account::{Account, BalanceFloor};
use super::reconciler::BalanceReconciler;
use super::transaction::{Transaction, TransactionSource};

/// Outcome of a monthly dues posting attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthlyPosting {
    /// A charge was created; the account now owes this much.
    Charged(Money),
    /// The member was already charged for this month.
    AlreadyCharged,
}

/// Writes invoice-derived ledger entries and applies their balance effect.
#[derive(Clone)]
pub struct LedgerWriter {
    ledger: Arc<dyn LedgerStore>,
    reconciler: BalanceReconciler,
}

impl LedgerWriter {
    pub fn new(ledger: Arc<dyn LedgerStore>, reconciler: BalanceReconciler) -> Self {
        Self { ledger, reconciler }
    }

    /// Records a successfully settled subscription invoice.
    ///
    /// Creates a matching charge+payment pair for the invoice — the pair
    /// is balance-neutral and exists so reporting sees both what was
    /// billed and what was paid — then settles the account's outstanding
    /// balance by the paid amount, floored at zero. The balance moves only
    /// when the payment entry is new.
    pub async fn settle_subscription_invoice(
        &self,
        account: &Account,
        amount: Money,
        period_start: NaiveDate,
        invoice_id: &str,
        description: &str,
    ) -> Result<(), DomainError> {
        let charge = Transaction::charge(
            account,
            amount,
            description,
            period_start,
            TransactionSource::Processor,
        )
        .with_invoice_id(invoice_id);
        self.ensure_invoice_entry(charge).await?;

        let payment = Transaction::payment(
            account,
            amount,
            description,
            period_start,
            TransactionSource::Processor,
        )
        .with_invoice_id(invoice_id);
        let payment_created = self.ensure_invoice_entry(payment).await?;

        if payment_created {
            self.reconciler
                .apply_delta(account.kind, &account.id, -amount, BalanceFloor::Zero)
                .await?;
        } else {
            tracing::debug!(
                invoice_id = %invoice_id,
                account_id = %account.id,
                "Invoice already settled; balance unchanged"
            );
        }

        Ok(())
    }

    /// Records a failed subscription invoice attempt.
    ///
    /// The one single-sided entry in the system: no payment occurred, so
    /// only a charge is written and the amount due is added to what the
    /// account owes (no clamp).
    pub async fn record_failed_invoice(
        &self,
        account: &Account,
        amount_due: Money,
        period_start: NaiveDate,
        invoice_id: &str,
        description: &str,
    ) -> Result<(), DomainError> {
        let charge = Transaction::charge(
            account,
            amount_due,
            description,
            period_start,
            TransactionSource::Processor,
        )
        .with_invoice_id(invoice_id);

        if self.ensure_invoice_entry(charge).await? {
            self.reconciler
                .apply_delta(account.kind, &account.id, amount_due, BalanceFloor::None)
                .await?;
        }

        Ok(())
    }

    /// Records a one-time payment (checkout in payment mode).
    ///
    /// Decreases the balance by the paid amount with no floor: paying
    /// more than is owed leaves a genuine credit. Dedup rests entirely on
    /// the store's unique provider payment id, since no invoice exists.
    pub async fn record_one_time_payment(
        &self,
        account: &Account,
        amount: Money,
        paid_on: NaiveDate,
        payment_id: &str,
        description: &str,
    ) -> Result<(), DomainError> {
        let payment = Transaction::payment(
            account,
            amount,
            description,
            paid_on,
            TransactionSource::Processor,
        )
        .with_payment_id(payment_id);

        match self.ledger.insert(&payment).await? {
            InsertOutcome::Inserted => {
                self.reconciler
                    .apply_delta(account.kind, &account.id, -amount, BalanceFloor::None)
                    .await?;
            }
            InsertOutcome::AlreadyExists => {
                tracing::info!(
                    payment_id = %payment_id,
                    account_id = %account.id,
                    "One-time payment already recorded; skipping"
                );
            }
        }

        Ok(())
    }

    /// Posts the monthly membership charge for one member.
    pub async fn post_monthly_charge(
        &self,
        account: &Account,
        amount: Money,
        now: &Timestamp,
        description: &str,
    ) -> Result<MonthlyPosting, DomainError> {
        let key = Transaction::monthly_key_for(account.id, now);

        if self.ledger.find_by_monthly_key(&key).await?.is_some() {
            return Ok(MonthlyPosting::AlreadyCharged);
        }

        let charge = Transaction::charge(
            account,
            amount,
            description,
            now.date(),
            TransactionSource::System,
        )
        .with_monthly_key(key);

        match self.ledger.insert(&charge).await? {
            InsertOutcome::Inserted => {
                let new_balance = self
                    .reconciler
                    .apply_delta(account.kind, &account.id, amount, BalanceFloor::None)
                    .await?;
                Ok(MonthlyPosting::Charged(new_balance))
            }
            // Lost the insert race to a concurrent run.
            InsertOutcome::AlreadyExists => Ok(MonthlyPosting::AlreadyCharged),
        }
    }

    /// Deletes a ledger entry, reversing its balance effect first.
    pub async fn remove_transaction(
        &self,
        transaction_id: &crate::domain::foundation::TransactionId,
    ) -> Result<(), DomainError> {
        let Some(removed) = self.ledger.remove(transaction_id).await? else {
            return Err(DomainError::new(
                crate::domain::foundation::ErrorCode::TransactionNotFound,
                format!("No transaction with id {}", transaction_id),
            ));
        };

        self.reconciler
            .apply_delta(
                removed.account_kind,
                &removed.account_id,
                -removed.signed_delta(),
                BalanceFloor::None,
            )
            .await?;

        Ok(())
    }

    /// Creates one invoice-keyed entry unless it already exists.
    ///
    /// Returns whether the entry was newly created. The lookup handles
    /// the common replay; the insert outcome handles the concurrent one.
    async fn ensure_invoice_entry(&self, entry: Transaction) -> Result<bool, DomainError> {
        let invoice_id = entry
            .provider_invoice_id
            .clone()
            .unwrap_or_default();

        if self
            .ledger
            .find_by_invoice(&invoice_id, entry.entry)
            .await?
            .is_some()
        {
            tracing::debug!(
                invoice_id = %invoice_id,
                entry_type = entry.entry.as_str(),
                "Ledger entry already exists for invoice; skipping"
            );
            return Ok(false);
        }

        Ok(self.ledger.insert(&entry).await? == InsertOutcome::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAccountStore, InMemoryLedgerStore};
    use crate::domain::billing::{AccountKind, LedgerEntryType};
    use crate::domain::foundation::AccountId;
    use crate::ports::AccountStore;

    struct Fixture {
        accounts: Arc<InMemoryAccountStore>,
        ledger: Arc<InMemoryLedgerStore>,
        writer: LedgerWriter,
        account: Account,
    }

    async fn fixture(balance_cents: i64) -> Fixture {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let mut account = Account::member(AccountId::new(), "Member", "m@example.com");
        account.balance = Money::from_cents(balance_cents);
        accounts.insert(&account).await.unwrap();

        let writer = LedgerWriter::new(
            ledger.clone(),
            BalanceReconciler::new(accounts.clone()),
        );
        Fixture {
            accounts,
            ledger,
            writer,
            account,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    async fn balance_of(f: &Fixture) -> i64 {
        f.accounts
            .find_by_id(AccountKind::Member, &f.account.id)
            .await
            .unwrap()
            .unwrap()
            .balance
            .cents()
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription invoice settlement
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn settlement_creates_charge_and_payment_pair() {
        let f = fixture(0).await;
        f.writer
            .settle_subscription_invoice(
                &f.account,
                Money::from_cents(3000),
                date(),
                "in_1",
                "Membership dues",
            )
            .await
            .unwrap();

        let entries = f
            .ledger
            .list_for_account(AccountKind::Member, &f.account.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|t| t.entry == LedgerEntryType::Charge));
        assert!(entries.iter().any(|t| t.entry == LedgerEntryType::Payment));
    }

    #[tokio::test]
    async fn settlement_reduces_outstanding_balance_with_floor() {
        let f = fixture(2000).await;
        f.writer
            .settle_subscription_invoice(
                &f.account,
                Money::from_cents(3000),
                date(),
                "in_2",
                "Membership dues",
            )
            .await
            .unwrap();

        // 2000 - 3000 clamps to zero rather than leaving phantom credit.
        assert_eq!(balance_of(&f).await, 0);
    }

    #[tokio::test]
    async fn replayed_settlement_is_a_no_op() {
        let f = fixture(5000).await;
        for _ in 0..3 {
            f.writer
                .settle_subscription_invoice(
                    &f.account,
                    Money::from_cents(3000),
                    date(),
                    "in_3",
                    "Membership dues",
                )
                .await
                .unwrap();
        }

        let entries = f
            .ledger
            .list_for_account(AccountKind::Member, &f.account.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(balance_of(&f).await, 2000);
    }

    // ══════════════════════════════════════════════════════════════
    // Failed invoices
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn failed_invoice_creates_single_sided_charge() {
        let f = fixture(0).await;
        f.writer
            .record_failed_invoice(
                &f.account,
                Money::from_cents(3000),
                date(),
                "in_fail",
                "Membership dues",
            )
            .await
            .unwrap();

        let entries = f
            .ledger
            .list_for_account(AccountKind::Member, &f.account.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry, LedgerEntryType::Charge);
        assert_eq!(balance_of(&f).await, 3000);
    }

    #[tokio::test]
    async fn replayed_failed_invoice_charges_once() {
        let f = fixture(0).await;
        for _ in 0..2 {
            f.writer
                .record_failed_invoice(
                    &f.account,
                    Money::from_cents(3000),
                    date(),
                    "in_fail_dup",
                    "Membership dues",
                )
                .await
                .unwrap();
        }
        assert_eq!(balance_of(&f).await, 3000);
    }

    // ══════════════════════════════════════════════════════════════
    // One-time payments
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn one_time_payment_reduces_balance_without_floor() {
        let f = fixture(5000).await;
        f.writer
            .record_one_time_payment(
                &f.account,
                Money::from_cents(2000),
                date(),
                "pi_1",
                "One-time payment",
            )
            .await
            .unwrap();

        assert_eq!(balance_of(&f).await, 3000);
    }

    #[tokio::test]
    async fn one_time_overpayment_leaves_credit() {
        let f = fixture(1000).await;
        f.writer
            .record_one_time_payment(
                &f.account,
                Money::from_cents(2500),
                date(),
                "pi_credit",
                "One-time payment",
            )
            .await
            .unwrap();

        assert_eq!(balance_of(&f).await, -1500);
    }

    #[tokio::test]
    async fn duplicate_one_time_payment_applies_once() {
        let f = fixture(5000).await;
        for _ in 0..2 {
            f.writer
                .record_one_time_payment(
                    &f.account,
                    Money::from_cents(2000),
                    date(),
                    "pi_dup",
                    "One-time payment",
                )
                .await
                .unwrap();
        }

        let entries = f
            .ledger
            .list_for_account(AccountKind::Member, &f.account.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(balance_of(&f).await, 3000);
    }

    // ══════════════════════════════════════════════════════════════
    // Monthly dues
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn monthly_charge_posts_once_per_month() {
        let f = fixture(0).await;
        let now = Timestamp::from_unix_secs(1_772_323_200); // 2026-03-01

        let first = f
            .writer
            .post_monthly_charge(&f.account, Money::from_cents(3000), &now, "Monthly Membership - March 2026")
            .await
            .unwrap();
        let second = f
            .writer
            .post_monthly_charge(&f.account, Money::from_cents(3000), &now, "Monthly Membership - March 2026")
            .await
            .unwrap();

        assert_eq!(first, MonthlyPosting::Charged(Money::from_cents(3000)));
        assert_eq!(second, MonthlyPosting::AlreadyCharged);
        assert_eq!(balance_of(&f).await, 3000);
    }

    #[tokio::test]
    async fn monthly_charge_posts_again_next_month() {
        let f = fixture(0).await;
        let march = Timestamp::from_unix_secs(1_772_323_200); // 2026-03-01
        let april = march.add_days(31);

        f.writer
            .post_monthly_charge(&f.account, Money::from_cents(3000), &march, "Monthly Membership - March 2026")
            .await
            .unwrap();
        let outcome = f
            .writer
            .post_monthly_charge(&f.account, Money::from_cents(3000), &april, "Monthly Membership - April 2026")
            .await
            .unwrap();

        assert!(matches!(outcome, MonthlyPosting::Charged(_)));
        assert_eq!(balance_of(&f).await, 6000);
    }

    // ══════════════════════════════════════════════════════════════
    // Deletion
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn removing_a_charge_reverses_its_balance_effect() {
        let f = fixture(0).await;
        let now = Timestamp::from_unix_secs(1_772_323_200);
        f.writer
            .post_monthly_charge(&f.account, Money::from_cents(3000), &now, "Monthly Membership - March 2026")
            .await
            .unwrap();

        let entries = f
            .ledger
            .list_for_account(AccountKind::Member, &f.account.id)
            .await
            .unwrap();
        f.writer.remove_transaction(&entries[0].id).await.unwrap();

        assert_eq!(balance_of(&f).await, 0);
        let remaining = f
            .ledger
            .list_for_account(AccountKind::Member, &f.account.id)
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn removing_unknown_transaction_fails() {
        let f = fixture(0).await;
        let err = f
            .writer
            .remove_transaction(&crate::domain::foundation::TransactionId::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.code,
            crate::domain::foundation::ErrorCode::TransactionNotFound
        );
    }
}
