//! Recurring payment aggregate and its lifecycle state machine.
//!
//! A recurring payment tracks one processor subscription:
//! `absent -> active -> (payoff decrementing) -> terminated`.
//!
//! # Invariants
//!
//! - Exactly one plan exists per `provider_subscription_id`; the store
//!   enforces this with an upsert keyed on that id.
//! - `remaining_amount`, when present, only decreases and is floored at
//!   zero. The plan deactivates exactly once, when the remainder first
//!   reaches zero.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, Money, RecurringPaymentId, Timestamp,
};

use super::AccountKind;

/// What a recurring payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringPaymentType {
    /// Standard membership dues.
    Membership,
    /// Extra monthly contribution on top of dues.
    AdditionalMonthly,
    /// Member paying down an outstanding balance in installments.
    BalancePayoff,
    /// Guest recurring donation.
    GuestDonation,
    /// Guest paying down an outstanding balance in installments.
    GuestBalancePayoff,
}

impl RecurringPaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringPaymentType::Membership => "membership",
            RecurringPaymentType::AdditionalMonthly => "additional_monthly",
            RecurringPaymentType::BalancePayoff => "balance_payoff",
            RecurringPaymentType::GuestDonation => "guest_donation",
            RecurringPaymentType::GuestBalancePayoff => "guest_balance_payoff",
        }
    }

    /// Parses the metadata wire name used by checkout sessions.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "membership" => Some(RecurringPaymentType::Membership),
            "additional_monthly" => Some(RecurringPaymentType::AdditionalMonthly),
            "balance_payoff" => Some(RecurringPaymentType::BalancePayoff),
            "guest_donation" => Some(RecurringPaymentType::GuestDonation),
            "guest_balance_payoff" => Some(RecurringPaymentType::GuestBalancePayoff),
            _ => None,
        }
    }

    /// Payoff plans carry a finite target and self-terminate.
    pub fn is_payoff(&self) -> bool {
        matches!(
            self,
            RecurringPaymentType::BalancePayoff | RecurringPaymentType::GuestBalancePayoff
        )
    }
}

impl std::fmt::Display for RecurringPaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of applying one paid installment to a payoff plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoffProgress {
    /// The plan is still open with this much left to pay.
    Remaining(Money),
    /// This installment completed the plan; the aggregate has just
    /// deactivated itself and the provider subscription should be
    /// canceled out-of-band.
    Completed,
}

/// A subscription-backed recurring payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringPayment {
    pub id: RecurringPaymentId,

    /// Owning account.
    pub account_id: AccountId,
    pub account_kind: AccountKind,

    pub payment_type: RecurringPaymentType,

    /// Installment amount billed each month.
    pub amount_per_month: Money,

    pub is_active: bool,

    pub start_date: Timestamp,

    /// When the processor is expected to bill next.
    pub next_charge_date: Timestamp,

    /// Processor subscription id; unique correlation key recovered from
    /// provider metadata.
    pub provider_subscription_id: String,

    /// Payoff plans only: the original target amount.
    pub total_amount: Option<Money>,

    /// Payoff plans only: what is still left to pay.
    pub remaining_amount: Option<Money>,

    /// Set once, when the plan terminates.
    pub ended_date: Option<Timestamp>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RecurringPayment {
    /// Creates an active open-ended plan (membership, additional monthly,
    /// guest donation).
    pub fn open_ended(
        account_id: AccountId,
        account_kind: AccountKind,
        payment_type: RecurringPaymentType,
        amount_per_month: Money,
        provider_subscription_id: impl Into<String>,
        start_date: Timestamp,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecurringPaymentId::new(),
            account_id,
            account_kind,
            payment_type,
            amount_per_month,
            is_active: true,
            start_date,
            next_charge_date: start_date.add_days(30),
            provider_subscription_id: provider_subscription_id.into(),
            total_amount: None,
            remaining_amount: None,
            ended_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an active payoff plan with a finite target.
    pub fn payoff(
        account_id: AccountId,
        account_kind: AccountKind,
        payment_type: RecurringPaymentType,
        amount_per_month: Money,
        total_amount: Money,
        provider_subscription_id: impl Into<String>,
        start_date: Timestamp,
    ) -> Self {
        let mut plan = Self::open_ended(
            account_id,
            account_kind,
            payment_type,
            amount_per_month,
            provider_subscription_id,
            start_date,
        );
        plan.total_amount = Some(total_amount);
        plan.remaining_amount = Some(total_amount);
        plan
    }

    /// Applies one paid installment to a payoff plan.
    ///
    /// The remainder decreases monotonically and is floored at zero; the
    /// transition to `Completed` happens at most once, when the remainder
    /// first reaches zero while the plan is still active.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the plan has no remaining
    /// amount to decrement (not a payoff plan).
    pub fn record_payoff_payment(&mut self, amount_paid: Money) -> Result<PayoffProgress, DomainError> {
        let remaining = self.remaining_amount.ok_or_else(|| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Recurring payment {} is not a payoff plan",
                    self.provider_subscription_id
                ),
            )
        })?;

        let new_remaining = remaining.saturating_reduce(amount_paid);
        self.remaining_amount = Some(new_remaining);
        self.updated_at = Timestamp::now();

        if new_remaining.is_zero() && self.is_active {
            self.terminate();
            return Ok(PayoffProgress::Completed);
        }

        Ok(PayoffProgress::Remaining(new_remaining))
    }

    /// Marks the plan inactive and stamps the end date.
    ///
    /// Idempotent: terminating an already-terminated plan keeps the
    /// original end date.
    pub fn terminate(&mut self) {
        if self.is_active {
            self.is_active = false;
            self.ended_date = Some(Timestamp::now());
        }
        self.updated_at = Timestamp::now();
    }
}
