//! Final stage: capture the payment and book the order.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{OrderStatus, PaymentStrategy};
use order_store::RentalStore;
use tracing::warn;

use crate::context::{OrderContext, StepOutcome};
use crate::gateway::PaymentGateway;
use crate::notifications::{NoticeKind, NotificationDispatcher};
use crate::step::PipelineStep;
use crate::{PipelineError, Result};

use super::{guarded, load_session};

const ALLOWED: &[OrderStatus] = &[
    OrderStatus::ApprovalSuccess,
    OrderStatus::WithoutDocs,
    OrderStatus::VerifyFailed,
    OrderStatus::ConfirmPaymentFailed,
];

/// Books the order.
///
/// Card payments were only reserved at init, so the step captures them
/// through the gateway first; the order sits in `AwaitConfirmPayment`
/// while the capture is in flight and falls to `ConfirmPaymentFailed` if
/// the gateway declines, which is also an allowed entry status so the
/// capture can be retried. Single-stage payments already moved the funds
/// and go straight to `Booked`.
pub struct ConfirmOrderStep {
    store: Arc<dyn RentalStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<NotificationDispatcher>,
}

impl ConfirmOrderStep {
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
impl PipelineStep for ConfirmOrderStep {
    fn name(&self) -> &'static str {
        "confirm_order"
    }

    fn allowed_statuses(&self) -> &'static [OrderStatus] {
        ALLOWED
    }

    async fn execute(&self, ctx: &OrderContext) -> Result<StepOutcome> {
        let session = load_session(self.store.as_ref(), ctx.order_id).await?;

        let order = if session.strategy == PaymentStrategy::Card {
            guarded(
                self.store.as_ref(),
                ctx.order_id,
                ALLOWED,
                OrderStatus::AwaitConfirmPayment,
            )
            .await?;

            if let Err(err) = self.gateway.confirm(&session.payment_id).await {
                warn!(order_id = %ctx.order_id, payment_id = %session.payment_id, error = %err,
                    "payment capture failed");
                guarded(
                    self.store.as_ref(),
                    ctx.order_id,
                    &[OrderStatus::AwaitConfirmPayment],
                    OrderStatus::ConfirmPaymentFailed,
                )
                .await?;
                return Err(PipelineError::Gateway(err));
            }

            guarded(
                self.store.as_ref(),
                ctx.order_id,
                &[OrderStatus::AwaitConfirmPayment],
                OrderStatus::Booked,
            )
            .await?
        } else {
            guarded(self.store.as_ref(), ctx.order_id, ALLOWED, OrderStatus::Booked).await?
        };

        self.notifier.notify(NoticeKind::OrderConfirmed, &order).await;
        metrics::counter!("orders_booked_total").increment(1);
        Ok(StepOutcome::Continue)
    }
}
