//! Background job adapters.

mod monthly_dues;

pub use monthly_dues::spawn as spawn_monthly_dues_job;
