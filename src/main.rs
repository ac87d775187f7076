//! Clubledger service entry point.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use clubledger::adapters::http::billing::{billing_router, BillingAppState};
use clubledger::adapters::jobs::spawn_monthly_dues_job;
use clubledger::adapters::postgres::{
    PostgresAccountStore, PostgresLedgerStore, PostgresProcessedEventStore,
    PostgresRecurringPaymentStore,
};
use clubledger::adapters::stripe::{StripeClient, StripeConfig};
use clubledger::application::handlers::billing::{
    ProviderWebhookHandler, ReconciliationDispatcher, RunMonthlyChargesHandler,
};
use clubledger::config::AppConfig;
use clubledger::domain::billing::{BalanceReconciler, LedgerWriter, WebhookVerifier};
use clubledger::domain::foundation::Money;
use clubledger::ports::{AccountStore, LedgerStore, PaymentProviderClient, ProcessedEventStore, RecurringPaymentStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level)),
        )
        .json()
        .init();

    config.validate()?;
    info!(test_mode = config.payment.is_test_mode(), "Starting clubledger");

    // Database
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database pool ready");

    // Stores
    let accounts: Arc<dyn AccountStore> = Arc::new(PostgresAccountStore::new(pool.clone()));
    let ledger: Arc<dyn LedgerStore> = Arc::new(PostgresLedgerStore::new(pool.clone()));
    let plans: Arc<dyn RecurringPaymentStore> =
        Arc::new(PostgresRecurringPaymentStore::new(pool.clone()));
    let processed_events: Arc<dyn ProcessedEventStore> =
        Arc::new(PostgresProcessedEventStore::new(pool));

    // Provider client
    let provider: Arc<dyn PaymentProviderClient> = Arc::new(StripeClient::new(
        StripeConfig::new(config.payment.api_key.clone())
            .with_base_url(config.payment.api_base_url.clone()),
    ));

    // Reconciliation engine
    let writer = LedgerWriter::new(ledger, BalanceReconciler::new(accounts.clone()));
    let dispatcher = ReconciliationDispatcher::new(
        accounts.clone(),
        plans,
        writer.clone(),
        provider,
    );
    let webhook_handler = Arc::new(ProviderWebhookHandler::new(
        WebhookVerifier::new(config.payment.webhook_secret.clone()),
        processed_events.clone(),
        dispatcher,
    ));

    // Monthly dues job
    let monthly_charges = Arc::new(RunMonthlyChargesHandler::new(
        accounts,
        writer,
        Money::from_cents(config.billing.monthly_dues_cents),
    ));
    spawn_monthly_dues_job(
        monthly_charges,
        processed_events,
        config.billing.event_retention_days,
    );

    // HTTP surface
    let app = billing_router()
        .with_state(BillingAppState { webhook_handler })
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
