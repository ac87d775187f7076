//! Billing command handlers.

mod activate_memberships;
mod handle_provider_webhook;
mod run_monthly_charges;

pub use activate_memberships::{ActivateMembershipsHandler, ActivationError, ActivationOutcome};
pub use handle_provider_webhook::{
    HandleProviderWebhookCommand, ProviderWebhookHandler, ReconciliationDispatcher,
};
pub use run_monthly_charges::{
    MemberChargeError, MonthlyChargeOutcome, RunMonthlyChargesHandler,
};
