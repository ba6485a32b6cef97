//! Cancellation, allowed from most of the pre-rental statuses.

use std::sync::Arc;

use async_trait::async_trait;
use domain::OrderStatus;
use order_store::RentalStore;

use crate::context::{OrderContext, StepOutcome};
use crate::gateway::PaymentGateway;
use crate::notifications::{NoticeKind, NotificationDispatcher};
use crate::step::PipelineStep;
use crate::{PipelineError, Result};

use super::{guarded, load_order};

const ALLOWED: &[OrderStatus] = &[
    OrderStatus::New,
    OrderStatus::AwaitPayment,
    OrderStatus::AwaitReservation,
    OrderStatus::ReservationSuccess,
    OrderStatus::PaymentSuccess,
    OrderStatus::WithoutDocs,
    OrderStatus::VerifyFailed,
    OrderStatus::ApprovalSuccess,
    OrderStatus::ConfirmPaymentFailed,
    OrderStatus::Booked,
];

/// Cancels the order and voids its payment session.
///
/// The gateway void runs before the status write: if the provider cannot
/// release the funds the order stays exactly where it was and the caller
/// can retry. An active rental cannot be canceled, only completed.
pub struct CancelOrderStep {
    store: Arc<dyn RentalStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<NotificationDispatcher>,
}

impl CancelOrderStep {
    pub fn new(
        store: Arc<dyn RentalStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
        }
    }
}

#[async_trait]
impl PipelineStep for CancelOrderStep {
    fn name(&self) -> &'static str {
        "cancel_order"
    }

    fn allowed_statuses(&self) -> &'static [OrderStatus] {
        ALLOWED
    }

    async fn execute(&self, ctx: &OrderContext) -> Result<StepOutcome> {
        let order = load_order(self.store.as_ref(), ctx.order_id).await?;

        // Check before touching the gateway so a non-cancelable order
        // never has its payment voided.
        if !self.check_guard(order.status) {
            return Err(PipelineError::InvalidState {
                order_id: ctx.order_id,
                current: order.status,
                allowed: ALLOWED.to_vec(),
            });
        }

        if let Some(session) = self.store.payment_session(ctx.order_id).await? {
            self.gateway
                .cancel(&session.payment_id)
                .await
                .map_err(PipelineError::Gateway)?;
        }

        let order = guarded(
            self.store.as_ref(),
            ctx.order_id,
            ALLOWED,
            OrderStatus::Canceled,
        )
        .await?;

        self.notifier.notify(NoticeKind::OrderCanceled, &order).await;
        metrics::counter!("orders_canceled_total").increment(1);
        Ok(StepOutcome::Continue)
    }
}
