//! RunMonthlyChargesHandler - posts membership dues once per calendar month.
//!
//! Invoked by the periodic jobs task (daily cadence) and safe to run any
//! number of times: each member/month pair is guarded by the structured
//! monthly key on its charge transaction. Per-member failures are
//! collected into the outcome instead of aborting the run.

use std::sync::Arc;

use crate::domain::billing::{LedgerWriter, MonthlyPosting};
use crate::domain::foundation::{AccountId, DomainError, Money, Timestamp};
use crate::ports::AccountStore;

/// One member the run could not charge.
#[derive(Debug, Clone)]
pub struct MemberChargeError {
    pub account_id: AccountId,
    pub message: String,
}

/// Aggregate result of one monthly dues run.
#[derive(Debug, Clone, Default)]
pub struct MonthlyChargeOutcome {
    /// Members newly charged this month.
    pub charged: u32,
    /// Members already charged this month.
    pub skipped: u32,
    /// Per-member failures; the rest of the run proceeded.
    pub errors: Vec<MemberChargeError>,
}

/// Handler for the monthly membership dues run.
pub struct RunMonthlyChargesHandler {
    accounts: Arc<dyn AccountStore>,
    writer: LedgerWriter,
    monthly_dues: Money,
}

impl RunMonthlyChargesHandler {
    pub fn new(accounts: Arc<dyn AccountStore>, writer: LedgerWriter, monthly_dues: Money) -> Self {
        Self {
            accounts,
            writer,
            monthly_dues,
        }
    }

    /// Charges every active member for the month containing `now`.
    pub async fn run(&self, now: Timestamp) -> Result<MonthlyChargeOutcome, DomainError> {
        let mut outcome = MonthlyChargeOutcome::default();

        // No configured dues amount disables the whole run.
        if self.monthly_dues.is_zero() || self.monthly_dues.is_negative() {
            tracing::info!("Monthly dues amount not configured; skipping run");
            return Ok(outcome);
        }

        let members = self.accounts.list_active_members().await?;
        let description = format!(
            "Monthly Membership - {}",
            now.as_datetime().format("%B %Y")
        );

        for member in members {
            match self
                .writer
                .post_monthly_charge(&member, self.monthly_dues, &now, &description)
                .await
            {
                Ok(MonthlyPosting::Charged(new_balance)) => {
                    outcome.charged += 1;
                    tracing::info!(
                        account_id = %member.id,
                        amount = %self.monthly_dues,
                        new_balance = %new_balance,
                        "Posted monthly membership charge"
                    );
                }
                Ok(MonthlyPosting::AlreadyCharged) => {
                    outcome.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(
                        account_id = %member.id,
                        error = %e,
                        "Failed to post monthly charge"
                    );
                    outcome.errors.push(MemberChargeError {
                        account_id: member.id,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            charged = outcome.charged,
            skipped = outcome.skipped,
            errors = outcome.errors.len(),
            "Monthly dues run complete"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAccountStore, InMemoryLedgerStore};
    use crate::domain::billing::{Account, AccountKind, BalanceReconciler};
    use crate::ports::LedgerStore;

    struct Fixture {
        accounts: Arc<InMemoryAccountStore>,
        ledger: Arc<InMemoryLedgerStore>,
    }

    impl Fixture {
        fn handler(&self, dues_cents: i64) -> RunMonthlyChargesHandler {
            RunMonthlyChargesHandler::new(
                self.accounts.clone(),
                LedgerWriter::new(
                    self.ledger.clone(),
                    BalanceReconciler::new(self.accounts.clone()),
                ),
                Money::from_cents(dues_cents),
            )
        }
    }

    fn fixture() -> Fixture {
        Fixture {
            accounts: Arc::new(InMemoryAccountStore::new()),
            ledger: Arc::new(InMemoryLedgerStore::new()),
        }
    }

    async fn seed_active_member(f: &Fixture) -> Account {
        let mut account = Account::member(AccountId::new(), "Member", "m@example.com");
        account.activate_membership().unwrap();
        f.accounts.insert(&account).await.unwrap();
        account
    }

    fn march() -> Timestamp {
        Timestamp::from_unix_secs(1_772_323_200) // 2026-03-01 UTC
    }

    #[tokio::test]
    async fn charges_each_active_member_once() {
        let f = fixture();
        let a = seed_active_member(&f).await;
        let b = seed_active_member(&f).await;

        let outcome = f.handler(3000).run(march()).await.unwrap();

        assert_eq!(outcome.charged, 2);
        assert_eq!(outcome.skipped, 0);
        assert!(outcome.errors.is_empty());

        for member in [&a, &b] {
            let entries = f
                .ledger
                .list_for_account(AccountKind::Member, &member.id)
                .await
                .unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].amount.cents(), 3000);
            assert!(entries[0].description.starts_with("Monthly Membership - March"));
        }
    }

    #[tokio::test]
    async fn second_run_in_same_month_charges_nothing() {
        let f = fixture();
        let member = seed_active_member(&f).await;

        f.handler(3000).run(march()).await.unwrap();
        let second = f.handler(3000).run(march()).await.unwrap();

        assert_eq!(second.charged, 0);
        assert_eq!(second.skipped, 1);

        let entries = f
            .ledger
            .list_for_account(AccountKind::Member, &member.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn next_month_charges_again() {
        let f = fixture();
        seed_active_member(&f).await;

        f.handler(3000).run(march()).await.unwrap();
        let april = f.handler(3000).run(march().add_days(31)).await.unwrap();

        assert_eq!(april.charged, 1);
    }

    #[tokio::test]
    async fn zero_dues_short_circuits_the_run() {
        let f = fixture();
        let member = seed_active_member(&f).await;

        let outcome = f.handler(0).run(march()).await.unwrap();

        assert_eq!(outcome.charged, 0);
        assert!(f
            .ledger
            .list_for_account(AccountKind::Member, &member.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn inactive_members_are_not_charged() {
        let f = fixture();
        let inactive = Account::member(AccountId::new(), "Inactive", "i@example.com");
        f.accounts.insert(&inactive).await.unwrap();

        let outcome = f.handler(3000).run(march()).await.unwrap();

        assert_eq!(outcome.charged, 0);
        assert_eq!(outcome.skipped, 0);
    }
}
