//! Billable account aggregate.
//!
//! Members and guests share identical billing semantics (ledger entries,
//! running balance, recurring payments), so both are modeled as one
//! `Account` aggregate discriminated by [`AccountKind`] rather than two
//! parallel types.
//!
//! # Invariants
//!
//! - `balance` equals the sum of charge amounts minus the sum of payment
//!   amounts across the account's ledger, modulo the clamp-at-zero updates
//!   documented on the ledger writer operations.
//! - A negative balance is a credit, not an error.
//! - `membership_active` is meaningful for members only; it is always
//!   `false` for guests.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Money, Timestamp};

/// The two billable account variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Member,
    Guest,
}

impl AccountKind {
    /// Wire/storage name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Member => "member",
            AccountKind::Guest => "guest",
        }
    }

    /// Parses a wire/storage name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(AccountKind::Member),
            "guest" => Some(AccountKind::Guest),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Clamp policy for balance updates.
///
/// Subscription invoice settlement floors the resulting balance at zero so
/// rounding residue never leaves a phantom credit; one-time payments do not,
/// because an overpayment is a real credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceFloor {
    None,
    Zero,
}

/// A billable account (member or guest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for this account.
    pub id: AccountId,

    /// Member or guest.
    pub kind: AccountKind,

    /// Display name.
    pub name: String,

    /// Contact email.
    pub email: String,

    /// Running balance: positive means owed, negative means credit.
    pub balance: Money,

    /// Payment processor customer id, once known.
    pub provider_customer_id: Option<String>,

    /// Payment processor subscription id, for accounts with an active plan.
    pub provider_subscription_id: Option<String>,

    /// Default payment method id at the processor.
    pub provider_default_payment_method_id: Option<String>,

    /// Whether membership dues apply (members only).
    pub membership_active: bool,

    /// When the account was created.
    pub created_at: Timestamp,

    /// When the account was last updated.
    pub updated_at: Timestamp,
}

impl Account {
    /// Creates a member account with a zero balance.
    pub fn member(id: AccountId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(id, AccountKind::Member, name, email)
    }

    /// Creates a guest account with a zero balance.
    pub fn guest(id: AccountId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(id, AccountKind::Guest, name, email)
    }

    fn new(
        id: AccountId,
        kind: AccountKind,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            kind,
            name: name.into(),
            email: email.into(),
            balance: Money::ZERO,
            provider_customer_id: None,
            provider_subscription_id: None,
            provider_default_payment_method_id: None,
            membership_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_member(&self) -> bool {
        self.kind == AccountKind::Member
    }

    /// Applies a signed balance delta and returns the new balance.
    ///
    /// `BalanceFloor::Zero` clamps the result at zero from below.
    pub fn apply_balance_delta(&mut self, delta: Money, floor: BalanceFloor) -> Money {
        let next = self.balance + delta;
        self.balance = match floor {
            BalanceFloor::None => next,
            BalanceFloor::Zero => next.floor_zero(),
        };
        self.updated_at = Timestamp::now();
        self.balance
    }

    /// Marks membership dues as applying to this account.
    ///
    /// # Errors
    ///
    /// Guests cannot hold memberships.
    pub fn activate_membership(&mut self) -> Result<(), DomainError> {
        if !self.is_member() {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot activate membership on a {} account", self.kind),
            ));
        }
        self.membership_active = true;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Stops membership dues for this account.
    pub fn deactivate_membership(&mut self) {
        self.membership_active = false;
        self.updated_at = Timestamp::now();
    }

    /// Records the processor subscription backing this account.
    pub fn attach_subscription(&mut self, subscription_id: impl Into<String>) {
        self.provider_subscription_id = Some(subscription_id.into());
        self.updated_at = Timestamp::now();
    }

    /// Clears the processor subscription reference.
    pub fn detach_subscription(&mut self) {
        self.provider_subscription_id = None;
        self.updated_at = Timestamp::now();
    }
}
