//! First stage: does the order have documents to work with.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{OrderStatus, PaymentStrategy};
use order_store::RentalStore;

use crate::context::{OrderContext, StepOutcome};
use crate::notifications::{NoticeKind, NotificationDispatcher};
use crate::step::PipelineStep;
use crate::Result;

use super::{guarded, load_order, load_session};

const ALLOWED: &[OrderStatus] = &[OrderStatus::AwaitPayment, OrderStatus::AwaitReservation];

/// Routes the order by how its documents arrive.
///
/// Manager-assisted orders have no uploaded documents; they park in
/// `WithoutDocs` and the chain halts until a manager collects them.
/// Self-service orders advance to the post-payment status matching their
/// payment strategy: a card reservation lands in `ReservationSuccess`,
/// single-stage payments in `PaymentSuccess`.
pub struct CheckDocumentsStep {
    store: Arc<dyn RentalStore>,
    notifier: Arc<NotificationDispatcher>,
}

impl CheckDocumentsStep {
    pub fn new(store: Arc<dyn RentalStore>, notifier: Arc<NotificationDispatcher>) -> Self {
        Self { store, notifier }
    }
}

#[async_trait]
impl PipelineStep for CheckDocumentsStep {
    fn name(&self) -> &'static str {
        "check_documents"
    }

    fn allowed_statuses(&self) -> &'static [OrderStatus] {
        ALLOWED
    }

    async fn execute(&self, ctx: &OrderContext) -> Result<StepOutcome> {
        let order = load_order(self.store.as_ref(), ctx.order_id).await?;

        if order.with_manager {
            let order = guarded(
                self.store.as_ref(),
                ctx.order_id,
                ALLOWED,
                OrderStatus::WithoutDocs,
            )
            .await?;
            self.notifier
                .notify(NoticeKind::OrderWithoutDocs, &order)
                .await;
            return Ok(StepOutcome::Halted {
                reason: "manager-assisted order awaits documents",
            });
        }

        let session = load_session(self.store.as_ref(), ctx.order_id).await?;
        let to = match session.strategy {
            PaymentStrategy::Card => OrderStatus::ReservationSuccess,
            PaymentStrategy::Sbp => OrderStatus::PaymentSuccess,
        };
        guarded(self.store.as_ref(), ctx.order_id, ALLOWED, to).await?;

        Ok(StepOutcome::Continue)
    }
}
