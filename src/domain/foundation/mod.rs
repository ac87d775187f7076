//! Foundation value objects and error types shared across the domain.

mod errors;
mod ids;
mod money;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AccountId, RecurringPaymentId, TransactionId};
pub use money::Money;
pub use timestamp::Timestamp;
