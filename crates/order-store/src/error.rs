//! Storage error types.

use common::OrderId;
use domain::{OrderStatus, PaymentId};
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// A guarded status write found the order in a status outside the
    /// allowed set. Nothing was mutated.
    #[error("status guard rejected order {order_id}: current status is {current}")]
    GuardRejected {
        order_id: OrderId,
        current: OrderStatus,
    },

    /// No payment session exists for the order.
    #[error("no payment session for order {0}")]
    SessionNotFound(OrderId),

    /// A payment session already exists where one was being inserted.
    #[error("duplicate payment session {0}")]
    DuplicateSession(PaymentId),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be decoded into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
