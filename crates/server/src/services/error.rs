//! Errors raised by the purchase, payment and staff services.

use thiserror::Error;

use hire_purchase_core::ledger::PaymentRuleError;
use hire_purchase_core::pricing::PricingError;
use hire_purchase_core::schedule::ScheduleError;

use super::auth::AuthError;
use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Rule(#[from] PaymentRuleError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}
