//! Pipeline error taxonomy.

use chrono::{DateTime, Utc};
use common::{OrderId, VehicleId};
use domain::{DomainError, OrderStatus};
use order_store::StoreError;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors surfaced by pipeline steps and the creation facade.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The status guard rejected a transition. Nothing was mutated; for
    /// redelivered work this is a no-op, not a failure.
    #[error("order {order_id} is in status {current}, expected one of {allowed:?}")]
    InvalidState {
        order_id: OrderId,
        current: OrderStatus,
        allowed: Vec<OrderStatus>,
    },

    /// The payment gateway failed. Any compensating status write has
    /// already happened by the time this propagates.
    #[error("payment gateway error: {0}")]
    Gateway(#[source] GatewayError),

    /// The requested rental range conflicts with a committed order or a
    /// live temporary hold.
    #[error("vehicle {vehicle_id} is unavailable from {starts_at} to {ends_at}")]
    RangeUnavailable {
        vehicle_id: VehicleId,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },

    /// Document verification declined the order.
    #[error("document verification failed for order {order_id}: {reason}")]
    VerificationFailed { order_id: OrderId, reason: String },

    /// The chain produced no result. Orchestration bug, not a domain
    /// condition.
    #[error("pipeline produced no result: {detail}")]
    MissingResult { detail: String },

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("store error: {0}")]
    Store(#[source] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => PipelineError::OrderNotFound(id),
            StoreError::GuardRejected { order_id, current } => PipelineError::InvalidState {
                order_id,
                current,
                allowed: Vec::new(),
            },
            other => PipelineError::Store(other),
        }
    }
}

impl From<GatewayError> for PipelineError {
    fn from(err: GatewayError) -> Self {
        PipelineError::Gateway(err)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
