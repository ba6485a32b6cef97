//! Domain error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while constructing or validating domain values.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A rental period where the start is not strictly before the end.
    #[error("invalid rental period: starts_at {starts_at} must be before ends_at {ends_at}")]
    InvalidPeriod {
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },

    /// A non-positive order amount.
    #[error("invalid order amount: {0} minor units")]
    InvalidAmount(i64),
}
