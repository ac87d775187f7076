//! PostgreSQL implementation of the LedgerStore port.
//!
//! The dedup keys are partial unique indexes (see the migration), so
//! `INSERT ... ON CONFLICT DO NOTHING` is the whole compare-and-insert:
//! zero rows affected means some dedup key already existed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    AccountKind, LedgerEntryType, Transaction, TransactionSource,
};
use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, Money, Timestamp, TransactionId,
};
use crate::ports::{InsertOutcome, LedgerStore};

/// PostgreSQL-backed transaction ledger.
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    account_id: Uuid,
    account_kind: String,
    entry_type: String,
    amount_cents: i64,
    description: String,
    posted_on: NaiveDate,
    source: String,
    provider_invoice_id: Option<String>,
    provider_payment_id: Option<String>,
    monthly_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let account_kind = AccountKind::parse(&row.account_kind).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid account kind value: {}", row.account_kind),
            )
        })?;
        let entry = LedgerEntryType::parse(&row.entry_type).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid entry type value: {}", row.entry_type),
            )
        })?;
        let source = TransactionSource::parse(&row.source).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid source value: {}", row.source),
            )
        })?;

        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            account_id: AccountId::from_uuid(row.account_id),
            account_kind,
            entry,
            amount: Money::from_cents(row.amount_cents),
            description: row.description,
            posted_on: row.posted_on,
            source,
            provider_invoice_id: row.provider_invoice_id,
            provider_payment_id: row.provider_payment_id,
            monthly_key: row.monthly_key,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn insert(&self, transaction: &Transaction) -> Result<InsertOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_transactions (
                id, account_id, account_kind, entry_type, amount_cents,
                description, posted_on, source,
                provider_invoice_id, provider_payment_id, monthly_key,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.account_id.as_uuid())
        .bind(transaction.account_kind.as_str())
        .bind(transaction.entry.as_str())
        .bind(transaction.amount.cents())
        .bind(&transaction.description)
        .bind(transaction.posted_on)
        .bind(transaction.source.as_str())
        .bind(&transaction.provider_invoice_id)
        .bind(&transaction.provider_payment_id)
        .bind(&transaction.monthly_key)
        .bind(transaction.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert transaction", e))?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn find_by_invoice(
        &self,
        invoice_id: &str,
        entry: LedgerEntryType,
    ) -> Result<Option<Transaction>, DomainError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM ledger_transactions WHERE provider_invoice_id = $1 AND entry_type = $2",
        )
        .bind(invoice_id)
        .bind(entry.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find transaction by invoice", e))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn find_by_monthly_key(&self, key: &str) -> Result<Option<Transaction>, DomainError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM ledger_transactions WHERE monthly_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find transaction by monthly key", e))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn list_for_account(
        &self,
        kind: AccountKind,
        account_id: &AccountId,
    ) -> Result<Vec<Transaction>, DomainError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM ledger_transactions
            WHERE account_kind = $1 AND account_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(kind.as_str())
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list transactions", e))?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn remove(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "DELETE FROM ledger_transactions WHERE id = $1 RETURNING *",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to delete transaction", e))?;

        row.map(Transaction::try_from).transpose()
    }
}
