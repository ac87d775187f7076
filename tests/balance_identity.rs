//! Property test for the balance identity.
//!
//! For any sequence of unclamped ledger operations, the account balance
//! must equal the sum of charge amounts minus the sum of payment
//! amounts, and redelivering every operation must not move it.

use std::sync::Arc;

use proptest::prelude::*;

use clubledger::adapters::memory::{InMemoryAccountStore, InMemoryLedgerStore};
use clubledger::domain::billing::{Account, BalanceReconciler, LedgerWriter};
use clubledger::domain::foundation::{AccountId, Money, Timestamp};
use clubledger::ports::AccountStore;

/// One unclamped ledger operation.
#[derive(Debug, Clone)]
enum Op {
    /// invoice.payment_failed: single-sided charge.
    FailedInvoice { amount_cents: i64 },
    /// One-time payment: single-sided payment, credit allowed.
    OneTimePayment { amount_cents: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..100_000).prop_map(|amount_cents| Op::FailedInvoice { amount_cents }),
        (1i64..100_000).prop_map(|amount_cents| Op::OneTimePayment { amount_cents }),
    ]
}

async fn apply_ops(ops: &[Op], deliveries_per_op: usize) -> i64 {
    let accounts = Arc::new(InMemoryAccountStore::new());
    let ledger = Arc::new(InMemoryLedgerStore::new());
    let writer = LedgerWriter::new(ledger, BalanceReconciler::new(accounts.clone()));

    let account = Account::member(AccountId::new(), "Prop Member", "p@example.com");
    accounts.insert(&account).await.unwrap();
    let today = Timestamp::now().date();

    for (index, op) in ops.iter().enumerate() {
        for _ in 0..deliveries_per_op {
            match op {
                Op::FailedInvoice { amount_cents } => {
                    writer
                        .record_failed_invoice(
                            &account,
                            Money::from_cents(*amount_cents),
                            today,
                            &format!("in_prop_{}", index),
                            "Membership dues (payment failed)",
                        )
                        .await
                        .unwrap();
                }
                Op::OneTimePayment { amount_cents } => {
                    writer
                        .record_one_time_payment(
                            &account,
                            Money::from_cents(*amount_cents),
                            today,
                            &format!("pi_prop_{}", index),
                            "One-time payment",
                        )
                        .await
                        .unwrap();
                }
            }
        }
    }

    accounts
        .find_by_id(account.kind, &account.id)
        .await
        .unwrap()
        .unwrap()
        .balance
        .cents()
}

fn expected_balance(ops: &[Op]) -> i64 {
    ops.iter().fold(0i64, |balance, op| match op {
        Op::FailedInvoice { amount_cents } => balance + amount_cents,
        Op::OneTimePayment { amount_cents } => balance - amount_cents,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn balance_equals_charges_minus_payments(ops in prop::collection::vec(op_strategy(), 0..20)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let balance = runtime.block_on(apply_ops(&ops, 1));
        prop_assert_eq!(balance, expected_balance(&ops));
    }

    #[test]
    fn redelivery_does_not_move_the_balance(ops in prop::collection::vec(op_strategy(), 0..20)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let balance = runtime.block_on(apply_ops(&ops, 3));
        prop_assert_eq!(balance, expected_balance(&ops));
    }
}
