//! PostgreSQL implementation of the AccountStore port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Account, AccountKind};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Money, Timestamp};
use crate::ports::AccountStore;

/// PostgreSQL-backed account storage.
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    kind: String,
    name: String,
    email: String,
    balance_cents: i64,
    provider_customer_id: Option<String>,
    provider_subscription_id: Option<String>,
    provider_default_payment_method_id: Option<String>,
    membership_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let kind = AccountKind::parse(&row.kind).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid account kind value: {}", row.kind),
            )
        })?;

        Ok(Account {
            id: AccountId::from_uuid(row.id),
            kind,
            name: row.name,
            email: row.email,
            balance: Money::from_cents(row.balance_cents),
            provider_customer_id: row.provider_customer_id,
            provider_subscription_id: row.provider_subscription_id,
            provider_default_payment_method_id: row.provider_default_payment_method_id,
            membership_active: row.membership_active,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn find_by_id(
        &self,
        kind: AccountKind,
        id: &AccountId,
    ) -> Result<Option<Account>, DomainError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE id = $1 AND kind = $2",
        )
        .bind(id.as_uuid())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load account", e))?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Account>, DomainError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE provider_customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load account by customer id", e))?;

        row.map(Account::try_from).transpose()
    }

    async fn list_active_members(&self) -> Result<Vec<Account>, DomainError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE kind = 'member' AND membership_active ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list active members", e))?;

        rows.into_iter().map(Account::try_from).collect()
    }

    async fn insert(&self, account: &Account) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, kind, name, email, balance_cents,
                provider_customer_id, provider_subscription_id,
                provider_default_payment_method_id, membership_active,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.kind.as_str())
        .bind(&account.name)
        .bind(&account.email)
        .bind(account.balance.cents())
        .bind(&account.provider_customer_id)
        .bind(&account.provider_subscription_id)
        .bind(&account.provider_default_payment_method_id)
        .bind(account.membership_active)
        .bind(account.created_at.as_datetime())
        .bind(account.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return DomainError::new(
                        ErrorCode::DuplicateKey,
                        format!("Account {} already exists", account.id),
                    );
                }
            }
            db_error("Failed to insert account", e)
        })?;

        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                name = $3,
                email = $4,
                balance_cents = $5,
                provider_customer_id = $6,
                provider_subscription_id = $7,
                provider_default_payment_method_id = $8,
                membership_active = $9,
                updated_at = $10
            WHERE id = $1 AND kind = $2
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.kind.as_str())
        .bind(&account.name)
        .bind(&account.email)
        .bind(account.balance.cents())
        .bind(&account.provider_customer_id)
        .bind(&account.provider_subscription_id)
        .bind(&account.provider_default_payment_method_id)
        .bind(account.membership_active)
        .bind(account.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update account", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::AccountNotFound,
                format!("No {} account with id {}", account.kind, account.id),
            ));
        }

        Ok(())
    }
}
