//! PostgreSQL implementation of the RecurringPaymentStore port.
//!
//! The upsert rides the unique constraint on `provider_subscription_id`;
//! `(xmax = 0)` in the RETURNING clause distinguishes a fresh insert from
//! a conflict-update without a second round trip.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{AccountKind, RecurringPayment, RecurringPaymentType};
use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, Money, RecurringPaymentId, Timestamp,
};
use crate::ports::{RecurringPaymentStore, UpsertOutcome};

/// PostgreSQL-backed recurring payment storage.
pub struct PostgresRecurringPaymentStore {
    pool: PgPool,
}

impl PostgresRecurringPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecurringPaymentRow {
    id: Uuid,
    account_id: Uuid,
    account_kind: String,
    payment_type: String,
    amount_per_month_cents: i64,
    is_active: bool,
    start_date: DateTime<Utc>,
    next_charge_date: DateTime<Utc>,
    provider_subscription_id: String,
    total_amount_cents: Option<i64>,
    remaining_amount_cents: Option<i64>,
    ended_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecurringPaymentRow> for RecurringPayment {
    type Error = DomainError;

    fn try_from(row: RecurringPaymentRow) -> Result<Self, Self::Error> {
        let account_kind = AccountKind::parse(&row.account_kind).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid account kind value: {}", row.account_kind),
            )
        })?;
        let payment_type = RecurringPaymentType::parse(&row.payment_type).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid payment type value: {}", row.payment_type),
            )
        })?;

        Ok(RecurringPayment {
            id: RecurringPaymentId::from_uuid(row.id),
            account_id: AccountId::from_uuid(row.account_id),
            account_kind,
            payment_type,
            amount_per_month: Money::from_cents(row.amount_per_month_cents),
            is_active: row.is_active,
            start_date: Timestamp::from_datetime(row.start_date),
            next_charge_date: Timestamp::from_datetime(row.next_charge_date),
            provider_subscription_id: row.provider_subscription_id,
            total_amount: row.total_amount_cents.map(Money::from_cents),
            remaining_amount: row.remaining_amount_cents.map(Money::from_cents),
            ended_date: row.ended_date.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl RecurringPaymentStore for PostgresRecurringPaymentStore {
    async fn upsert_by_subscription_id(
        &self,
        plan: &RecurringPayment,
    ) -> Result<UpsertOutcome, DomainError> {
        let (inserted,): (bool,) = sqlx::query_as(
            r#"
            INSERT INTO recurring_payments (
                id, account_id, account_kind, payment_type,
                amount_per_month_cents, is_active, start_date, next_charge_date,
                provider_subscription_id, total_amount_cents, remaining_amount_cents,
                ended_date, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (provider_subscription_id) DO UPDATE SET
                amount_per_month_cents = EXCLUDED.amount_per_month_cents,
                start_date = EXCLUDED.start_date,
                next_charge_date = EXCLUDED.next_charge_date,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(plan.id.as_uuid())
        .bind(plan.account_id.as_uuid())
        .bind(plan.account_kind.as_str())
        .bind(plan.payment_type.as_str())
        .bind(plan.amount_per_month.cents())
        .bind(plan.is_active)
        .bind(plan.start_date.as_datetime())
        .bind(plan.next_charge_date.as_datetime())
        .bind(&plan.provider_subscription_id)
        .bind(plan.total_amount.map(|m| m.cents()))
        .bind(plan.remaining_amount.map(|m| m.cents()))
        .bind(plan.ended_date.map(|t| *t.as_datetime()))
        .bind(plan.created_at.as_datetime())
        .bind(plan.updated_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to upsert recurring payment", e))?;

        Ok(if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<RecurringPayment>, DomainError> {
        let row = sqlx::query_as::<_, RecurringPaymentRow>(
            "SELECT * FROM recurring_payments WHERE provider_subscription_id = $1",
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find recurring payment", e))?;

        row.map(RecurringPayment::try_from).transpose()
    }

    async fn update(&self, plan: &RecurringPayment) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE recurring_payments SET
                amount_per_month_cents = $2,
                is_active = $3,
                next_charge_date = $4,
                total_amount_cents = $5,
                remaining_amount_cents = $6,
                ended_date = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(plan.id.as_uuid())
        .bind(plan.amount_per_month.cents())
        .bind(plan.is_active)
        .bind(plan.next_charge_date.as_datetime())
        .bind(plan.total_amount.map(|m| m.cents()))
        .bind(plan.remaining_amount.map(|m| m.cents()))
        .bind(plan.ended_date.map(|t| *t.as_datetime()))
        .bind(plan.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update recurring payment", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::RecurringPaymentNotFound,
                format!("No recurring payment with id {}", plan.id),
            ));
        }

        Ok(())
    }

    async fn list_active_for_account(
        &self,
        kind: AccountKind,
        account_id: &AccountId,
    ) -> Result<Vec<RecurringPayment>, DomainError> {
        let rows = sqlx::query_as::<_, RecurringPaymentRow>(
            r#"
            SELECT * FROM recurring_payments
            WHERE account_kind = $1 AND account_id = $2 AND is_active
            ORDER BY created_at
            "#,
        )
        .bind(kind.as_str())
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list recurring payments", e))?;

        rows.into_iter().map(RecurringPayment::try_from).collect()
    }
}
