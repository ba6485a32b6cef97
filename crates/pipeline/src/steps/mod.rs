//! The concrete lifecycle steps.

mod cancel_order;
mod check_documents;
mod complete_order;
mod confirm_order;
mod reinit_payment_session;
mod verify_documents;

pub use cancel_order::CancelOrderStep;
pub use check_documents::CheckDocumentsStep;
pub use complete_order::CompleteOrderStep;
pub use confirm_order::ConfirmOrderStep;
pub use reinit_payment_session::ReinitPaymentSessionStep;
pub use verify_documents::VerifyDocumentsStep;

use common::OrderId;
use domain::{Order, OrderStatus, PaymentSession};
use order_store::{RentalStore, StoreError};

use crate::{PipelineError, Result};

/// Loads the order or fails with `OrderNotFound`.
pub(crate) async fn load_order(store: &dyn RentalStore, id: OrderId) -> Result<Order> {
    store
        .order(id)
        .await?
        .ok_or(PipelineError::OrderNotFound(id))
}

/// Loads the order's payment session or fails with `SessionNotFound`.
pub(crate) async fn load_session(store: &dyn RentalStore, id: OrderId) -> Result<PaymentSession> {
    store
        .payment_session(id)
        .await?
        .ok_or(PipelineError::Store(StoreError::SessionNotFound(id)))
}

/// Guarded status write with the step's allowed set attached to the error.
pub(crate) async fn guarded(
    store: &dyn RentalStore,
    id: OrderId,
    allowed: &[OrderStatus],
    to: OrderStatus,
) -> Result<Order> {
    store.transition(id, allowed, to).await.map_err(|err| match err {
        StoreError::GuardRejected { order_id, current } => PipelineError::InvalidState {
            order_id,
            current,
            allowed: allowed.to_vec(),
        },
        StoreError::OrderNotFound(id) => PipelineError::OrderNotFound(id),
        other => PipelineError::Store(other),
    })
}
