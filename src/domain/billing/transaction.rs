//! Ledger transaction entity.
//!
//! Transactions are the append-mostly source of truth for an account's
//! balance. A charge increases what the account owes; a payment decreases
//! it. Entries are immutable once created; the only permitted mutation is
//! deletion, which must reverse the entry's balance effect.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, Money, Timestamp, TransactionId};

use super::{Account, AccountKind};

/// Whether a ledger entry bills or settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    Charge,
    Payment,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::Charge => "charge",
            LedgerEntryType::Payment => "payment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "charge" => Some(LedgerEntryType::Charge),
            "payment" => Some(LedgerEntryType::Payment),
            _ => None,
        }
    }
}

/// Where a ledger entry originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    /// Created by this system (monthly dues run, manual entry).
    System,
    /// Derived from a payment processor notification.
    Processor,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionSource::System => "system",
            TransactionSource::Processor => "processor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(TransactionSource::System),
            "processor" => Some(TransactionSource::Processor),
            _ => None,
        }
    }
}

/// A single ledger entry for a billable account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,

    /// Account this entry belongs to.
    pub account_id: AccountId,

    /// Member- or guest-scoped entry; semantics are identical.
    pub account_kind: AccountKind,

    pub entry: LedgerEntryType,

    /// Positive amount in minor units.
    pub amount: Money,

    pub description: String,

    /// Business date of the entry (billing period start for invoices).
    pub posted_on: NaiveDate,

    pub source: TransactionSource,

    /// Processor invoice id; half of the (invoice id, entry type) dedup key.
    pub provider_invoice_id: Option<String>,

    /// Processor payment id; the dedup key for one-time payments that
    /// carry no invoice.
    pub provider_payment_id: Option<String>,

    /// Structured monthly-dues dedup key: `"{account_id}:{YYYY-MM}"`.
    pub monthly_key: Option<String>,

    pub created_at: Timestamp,
}

impl Transaction {
    /// Creates a charge entry for the given account.
    pub fn charge(
        account: &Account,
        amount: Money,
        description: impl Into<String>,
        posted_on: NaiveDate,
        source: TransactionSource,
    ) -> Self {
        Self::entry(account, LedgerEntryType::Charge, amount, description, posted_on, source)
    }

    /// Creates a payment entry for the given account.
    pub fn payment(
        account: &Account,
        amount: Money,
        description: impl Into<String>,
        posted_on: NaiveDate,
        source: TransactionSource,
    ) -> Self {
        Self::entry(account, LedgerEntryType::Payment, amount, description, posted_on, source)
    }

    fn entry(
        account: &Account,
        entry: LedgerEntryType,
        amount: Money,
        description: impl Into<String>,
        posted_on: NaiveDate,
        source: TransactionSource,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_id: account.id,
            account_kind: account.kind,
            entry,
            amount,
            description: description.into(),
            posted_on,
            source,
            provider_invoice_id: None,
            provider_payment_id: None,
            monthly_key: None,
            created_at: Timestamp::now(),
        }
    }

    /// Tags the entry with its processor invoice id.
    pub fn with_invoice_id(mut self, invoice_id: impl Into<String>) -> Self {
        self.provider_invoice_id = Some(invoice_id.into());
        self
    }

    /// Tags the entry with its processor payment id.
    pub fn with_payment_id(mut self, payment_id: impl Into<String>) -> Self {
        self.provider_payment_id = Some(payment_id.into());
        self
    }

    /// Tags the entry with a monthly-dues idempotency key.
    pub fn with_monthly_key(mut self, key: impl Into<String>) -> Self {
        self.monthly_key = Some(key.into());
        self
    }

    /// The entry's effect on the account balance: positive for charges,
    /// negative for payments.
    pub fn signed_delta(&self) -> Money {
        match self.entry {
            LedgerEntryType::Charge => self.amount,
            LedgerEntryType::Payment => -self.amount,
        }
    }

    /// Builds the structured monthly-dues key for an account and month.
    pub fn monthly_key_for(account_id: AccountId, at: &Timestamp) -> String {
        format!("{}:{}", account_id, at.month_key())
    }
}
