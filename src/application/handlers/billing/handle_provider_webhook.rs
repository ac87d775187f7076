//! ProviderWebhookHandler - command handler for inbound processor webhooks.
//!
//! Flow: verify the signature over the raw body, admit the event through
//! the idempotency gate, then dispatch to the per-event reconciliation
//! logic. Account correlation comes from checkout metadata for session
//! events and from the recurring-payment subscription key for invoice
//! events, falling back to subscription metadata fetched from the
//! provider when no local plan exists yet.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::billing::{
    Account, AccountKind, CheckoutSessionPayload, EventDispatcher, EventGate, InvoicePayload,
    LedgerWriter, PayoffProgress, ProviderEvent, ProviderEventKind, RecurringPayment,
    RecurringPaymentType, SubscriptionPayload, WebhookAck, WebhookError, WebhookVerifier,
    account_ref_from_metadata,
};
use crate::domain::foundation::{AccountId, Money, Timestamp};
use crate::ports::{
    AccountStore, PaymentProviderClient, ProcessedEventStore, RecurringPaymentStore,
};

/// Command to handle one webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleProviderWebhookCommand {
    /// Raw request body, byte-exact as delivered.
    pub payload: Vec<u8>,
    /// Signature header value.
    pub signature: String,
}

/// Handler for inbound provider webhooks.
pub struct ProviderWebhookHandler {
    verifier: WebhookVerifier,
    gate: EventGate,
    dispatcher: ReconciliationDispatcher,
}

impl ProviderWebhookHandler {
    pub fn new(
        verifier: WebhookVerifier,
        processed_events: Arc<dyn ProcessedEventStore>,
        dispatcher: ReconciliationDispatcher,
    ) -> Self {
        Self {
            verifier,
            gate: EventGate::new(processed_events),
            dispatcher,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleProviderWebhookCommand,
    ) -> Result<WebhookAck, WebhookError> {
        let event = self.verifier.verify_and_parse(&cmd.payload, &cmd.signature)?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Processing provider webhook event"
        );

        self.gate.process(&event, &self.dispatcher).await
    }
}

/// Routes admitted events to their reconciliation logic.
pub struct ReconciliationDispatcher {
    accounts: Arc<dyn AccountStore>,
    plans: Arc<dyn RecurringPaymentStore>,
    writer: LedgerWriter,
    provider: Arc<dyn PaymentProviderClient>,
}

impl ReconciliationDispatcher {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        plans: Arc<dyn RecurringPaymentStore>,
        writer: LedgerWriter,
        provider: Arc<dyn PaymentProviderClient>,
    ) -> Self {
        Self {
            accounts,
            plans,
            writer,
            provider,
        }
    }

    async fn load_account(
        &self,
        kind: AccountKind,
        id: &AccountId,
    ) -> Result<Account, WebhookError> {
        self.accounts
            .find_by_id(kind, id)
            .await?
            .ok_or(WebhookError::AccountNotFound)
    }

    // ── checkout.session.completed ────────────────────────────────

    async fn on_checkout_completed(&self, event: &ProviderEvent) -> Result<(), WebhookError> {
        let session: CheckoutSessionPayload = event
            .object_as()
            .map_err(|e| WebhookError::MalformedEvent(e.to_string()))?;

        if session.is_payment_mode() {
            return self.on_one_time_payment(&session).await;
        }
        if session.is_subscription_mode() {
            return self.on_subscription_started(&session).await;
        }

        Err(WebhookError::Ignored(format!(
            "checkout session {} in unsupported mode '{}'",
            session.id, session.mode
        )))
    }

    async fn on_one_time_payment(
        &self,
        session: &CheckoutSessionPayload,
    ) -> Result<(), WebhookError> {
        let (kind, account_id) = session.account_ref()?;
        let account = self.load_account(kind, &account_id).await?;

        let amount_cents = session
            .amount_total
            .ok_or(WebhookError::MissingField("amount_total"))?;
        let amount = Money::positive(amount_cents)
            .map_err(|e| WebhookError::MalformedEvent(e.to_string()))?;

        // The payment intent id is stable across redeliveries of the same
        // economic payment; the session id is the fallback dedup key.
        let payment_id = session
            .payment_intent
            .clone()
            .unwrap_or_else(|| session.id.clone());

        self.writer
            .record_one_time_payment(
                &account,
                amount,
                Timestamp::now().date(),
                &payment_id,
                "One-time payment",
            )
            .await?;

        tracing::info!(
            account_id = %account.id,
            account_kind = %account.kind,
            amount = %amount,
            payment_id = %payment_id,
            "Recorded one-time payment"
        );

        Ok(())
    }

    async fn on_subscription_started(
        &self,
        session: &CheckoutSessionPayload,
    ) -> Result<(), WebhookError> {
        let (kind, account_id) = session.account_ref()?;
        let mut account = self.load_account(kind, &account_id).await?;

        let subscription_id = session
            .subscription
            .clone()
            .ok_or(WebhookError::MissingField("subscription"))?;
        let payment_type = session.payment_type()?;

        let amount_cents = session
            .metadata
            .get("amount_per_month_cents")
            .and_then(|v| v.parse::<i64>().ok())
            .or(session.amount_total)
            .ok_or(WebhookError::MissingMetadata("amount_per_month_cents"))?;
        let amount_per_month = Money::positive(amount_cents)
            .map_err(|e| WebhookError::MalformedEvent(e.to_string()))?;

        let start_date = Timestamp::now();
        let plan = if payment_type.is_payoff() {
            let total = session
                .total_amount()
                .ok_or(WebhookError::MissingMetadata("total_amount_cents"))?;
            RecurringPayment::payoff(
                account.id,
                account.kind,
                payment_type,
                amount_per_month,
                total,
                subscription_id.clone(),
                start_date,
            )
        } else {
            RecurringPayment::open_ended(
                account.id,
                account.kind,
                payment_type,
                amount_per_month,
                subscription_id.clone(),
                start_date,
            )
        };

        // Replayed checkout events update the existing plan in place.
        let outcome = self.plans.upsert_by_subscription_id(&plan).await?;

        account.attach_subscription(&subscription_id);
        if account.provider_customer_id.is_none() {
            account.provider_customer_id = session.customer.clone();
        }
        if payment_type == RecurringPaymentType::Membership {
            account
                .activate_membership()
                .map_err(|e| WebhookError::Storage(e.to_string()))?;
        }
        self.accounts.update(&account).await?;

        tracing::info!(
            account_id = %account.id,
            subscription_id = %subscription_id,
            payment_type = %payment_type,
            outcome = ?outcome,
            "Recurring payment registered from checkout"
        );

        Ok(())
    }

    // ── invoice.paid ──────────────────────────────────────────────

    async fn on_invoice_paid(&self, event: &ProviderEvent) -> Result<(), WebhookError> {
        let invoice: InvoicePayload = event
            .object_as()
            .map_err(|e| WebhookError::MalformedEvent(e.to_string()))?;

        let Some(subscription_id) = invoice.subscription.clone() else {
            return Err(WebhookError::Ignored(format!(
                "invoice {} has no subscription",
                invoice.id
            )));
        };

        if invoice.amount_paid <= 0 {
            return Err(WebhookError::Ignored(format!(
                "invoice {} settled zero amount",
                invoice.id
            )));
        }
        let amount = Money::from_cents(invoice.amount_paid);
        let period_start = invoice_period_start(&invoice);

        match self.plans.find_by_subscription_id(&subscription_id).await? {
            Some(mut plan) => {
                let account = self.load_account(plan.account_kind, &plan.account_id).await?;

                self.writer
                    .settle_subscription_invoice(
                        &account,
                        amount,
                        period_start,
                        &invoice.id,
                        settlement_description(plan.payment_type),
                    )
                    .await?;

                if plan.payment_type.is_payoff() {
                    self.advance_payoff(&mut plan, amount).await?;
                }

                Ok(())
            }
            None => {
                self.settle_without_local_plan(&subscription_id, &invoice, amount, period_start)
                    .await
            }
        }
    }

    /// Invoice events can race ahead of the checkout event that creates
    /// the local plan. Recover the account from subscription metadata at
    /// the provider and settle anyway; the plan arrives with its own
    /// event.
    async fn settle_without_local_plan(
        &self,
        subscription_id: &str,
        invoice: &InvoicePayload,
        amount: Money,
        period_start: NaiveDate,
    ) -> Result<(), WebhookError> {
        let subscription = match self.provider.retrieve_subscription(subscription_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!(
                    subscription_id = %subscription_id,
                    invoice_id = %invoice.id,
                    error = %e,
                    "No local plan and subscription lookup failed"
                );
                return Err(WebhookError::Provider(e.to_string()));
            }
        };

        match account_ref_from_metadata(&subscription.metadata) {
            Ok((kind, account_id)) => {
                let account = self.load_account(kind, &account_id).await?;
                self.writer
                    .settle_subscription_invoice(
                        &account,
                        amount,
                        period_start,
                        &invoice.id,
                        "Subscription payment",
                    )
                    .await?;
                tracing::warn!(
                    subscription_id = %subscription_id,
                    invoice_id = %invoice.id,
                    account_id = %account_id,
                    "Settled invoice for subscription with no local plan yet"
                );
                Ok(())
            }
            Err(_) => Err(WebhookError::Ignored(format!(
                "no local plan or account correlation for subscription {}",
                subscription_id
            ))),
        }
    }

    async fn advance_payoff(
        &self,
        plan: &mut RecurringPayment,
        amount_paid: Money,
    ) -> Result<(), WebhookError> {
        let progress = plan
            .record_payoff_payment(amount_paid)
            .map_err(|e| WebhookError::Storage(e.to_string()))?;
        self.plans.update(plan).await?;

        if progress == PayoffProgress::Completed {
            tracing::info!(
                subscription_id = %plan.provider_subscription_id,
                account_id = %plan.account_id,
                "Payoff plan completed; canceling provider subscription"
            );
            // Local state already reflects completion; a failed cancel is
            // retried by the next invoice, not by failing this event.
            if let Err(e) = self
                .provider
                .cancel_subscription(&plan.provider_subscription_id)
                .await
            {
                tracing::warn!(
                    subscription_id = %plan.provider_subscription_id,
                    error = %e,
                    "Failed to cancel provider subscription for completed payoff"
                );
            }
        }

        Ok(())
    }

    // ── invoice.payment_failed ────────────────────────────────────

    async fn on_invoice_payment_failed(&self, event: &ProviderEvent) -> Result<(), WebhookError> {
        let invoice: InvoicePayload = event
            .object_as()
            .map_err(|e| WebhookError::MalformedEvent(e.to_string()))?;

        let Some(subscription_id) = invoice.subscription.clone() else {
            return Err(WebhookError::Ignored(format!(
                "failed invoice {} has no subscription",
                invoice.id
            )));
        };

        let Some(plan) = self.plans.find_by_subscription_id(&subscription_id).await? else {
            return Err(WebhookError::Ignored(format!(
                "failed invoice {} for untracked subscription {}",
                invoice.id, subscription_id
            )));
        };

        if plan.payment_type != RecurringPaymentType::Membership {
            return Err(WebhookError::Ignored(format!(
                "payment failure on {} plan is not ledgered",
                plan.payment_type
            )));
        }

        if invoice.amount_due <= 0 {
            return Err(WebhookError::Ignored(format!(
                "failed invoice {} has no amount due",
                invoice.id
            )));
        }

        let account = self.load_account(plan.account_kind, &plan.account_id).await?;
        let amount_due = Money::from_cents(invoice.amount_due);

        self.writer
            .record_failed_invoice(
                &account,
                amount_due,
                invoice_period_start(&invoice),
                &invoice.id,
                "Membership dues (payment failed)",
            )
            .await?;

        tracing::warn!(
            account_id = %account.id,
            invoice_id = %invoice.id,
            amount_due = %amount_due,
            "Membership invoice payment failed; balance increased"
        );

        Ok(())
    }

    // ── customer.subscription.deleted ─────────────────────────────

    async fn on_subscription_deleted(&self, event: &ProviderEvent) -> Result<(), WebhookError> {
        let subscription: SubscriptionPayload = event
            .object_as()
            .map_err(|e| WebhookError::MalformedEvent(e.to_string()))?;

        let Some(mut plan) = self
            .plans
            .find_by_subscription_id(&subscription.id)
            .await?
        else {
            // The deletion may race ahead of the plan's creation event,
            // or refer to a subscription this system never tracked.
            tracing::info!(
                subscription_id = %subscription.id,
                "Subscription deleted with no matching recurring payment; nothing to do"
            );
            return Ok(());
        };

        plan.terminate();
        self.plans.update(&plan).await?;

        if let Some(mut account) = self
            .accounts
            .find_by_id(plan.account_kind, &plan.account_id)
            .await?
        {
            if account.provider_subscription_id.as_deref() == Some(subscription.id.as_str()) {
                account.detach_subscription();
            }
            if plan.payment_type == RecurringPaymentType::Membership {
                account.deactivate_membership();
            }
            self.accounts.update(&account).await?;
        }

        tracing::info!(
            subscription_id = %subscription.id,
            account_id = %plan.account_id,
            payment_type = %plan.payment_type,
            "Recurring payment terminated by provider"
        );

        Ok(())
    }
}

#[async_trait]
impl EventDispatcher for ReconciliationDispatcher {
    async fn dispatch(&self, event: &ProviderEvent) -> Result<(), WebhookError> {
        match event.kind() {
            ProviderEventKind::CheckoutSessionCompleted => self.on_checkout_completed(event).await,
            ProviderEventKind::InvoicePaid => self.on_invoice_paid(event).await,
            ProviderEventKind::InvoicePaymentFailed => self.on_invoice_payment_failed(event).await,
            ProviderEventKind::SubscriptionDeleted => self.on_subscription_deleted(event).await,
            ProviderEventKind::Unknown => Err(WebhookError::Ignored(format!(
                "no handler for event type '{}'",
                event.event_type
            ))),
        }
    }
}

fn invoice_period_start(invoice: &InvoicePayload) -> NaiveDate {
    if invoice.period_start > 0 {
        Timestamp::from_unix_secs(invoice.period_start).date()
    } else {
        Timestamp::now().date()
    }
}

fn settlement_description(payment_type: RecurringPaymentType) -> &'static str {
    match payment_type {
        RecurringPaymentType::Membership => "Membership dues",
        RecurringPaymentType::AdditionalMonthly => "Additional monthly contribution",
        RecurringPaymentType::BalancePayoff | RecurringPaymentType::GuestBalancePayoff => {
            "Balance payoff installment"
        }
        RecurringPaymentType::GuestDonation => "Recurring donation",
    }
}
