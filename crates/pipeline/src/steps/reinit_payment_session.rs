//! Re-opening a payment session for a dead order.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{OrderStatus, PaymentStrategy};
use order_store::RentalStore;
use tracing::warn;

use crate::calendar::BookingCalendar;
use crate::context::{OrderContext, StepOutcome};
use crate::sessions::PaymentSessionManager;
use crate::step::PipelineStep;
use crate::{PipelineError, Result};

use super::{guarded, load_order, load_session};

const ALLOWED: &[OrderStatus] = &[
    OrderStatus::Rejected,
    OrderStatus::ReinitFailed,
    OrderStatus::PaymentSessionExpired,
];

/// Gives an order whose payment fell through another chance to pay.
///
/// Orders in the allowed statuses stopped holding their rental range, so
/// the order re-claims it through a calendar hold kept live until the
/// move to `OnReinit` commits; a concurrent creation for the same range
/// sees the hold and loses. A failed gateway init leaves the order in
/// `ReinitFailed` (still reinitializable) with the old session intact.
/// On success the old session's replacement and the new awaiting status
/// are applied as one atomic unit.
pub struct ReinitPaymentSessionStep {
    store: Arc<dyn RentalStore>,
    sessions: Arc<PaymentSessionManager>,
    calendar: Arc<BookingCalendar>,
}

impl ReinitPaymentSessionStep {
    pub fn new(
        store: Arc<dyn RentalStore>,
        sessions: Arc<PaymentSessionManager>,
        calendar: Arc<BookingCalendar>,
    ) -> Self {
        Self {
            store,
            sessions,
            calendar,
        }
    }
}

#[async_trait]
impl PipelineStep for ReinitPaymentSessionStep {
    fn name(&self) -> &'static str {
        "reinit_payment_session"
    }

    fn allowed_statuses(&self) -> &'static [OrderStatus] {
        ALLOWED
    }

    async fn execute(&self, ctx: &OrderContext) -> Result<StepOutcome> {
        let order = load_order(self.store.as_ref(), ctx.order_id).await?;
        let old_session = load_session(self.store.as_ref(), ctx.order_id).await?;

        // Held until after the order is in OnReinit, at which point the
        // committed row itself blocks the range again.
        let _hold = self
            .calendar
            .hold(order.vehicle_id, order.period(), Some(order.id))
            .await?;

        let order = guarded(
            self.store.as_ref(),
            ctx.order_id,
            ALLOWED,
            OrderStatus::OnReinit,
        )
        .await?;

        let new_session = match self.sessions.init(&order, old_session.strategy).await {
            Ok(session) => session,
            Err(err) => {
                warn!(order_id = %ctx.order_id, error = %err, "session reinit failed");
                guarded(
                    self.store.as_ref(),
                    ctx.order_id,
                    &[OrderStatus::OnReinit],
                    OrderStatus::ReinitFailed,
                )
                .await?;
                return Err(PipelineError::Gateway(err));
            }
        };

        let to = match new_session.strategy {
            PaymentStrategy::Card => OrderStatus::AwaitReservation,
            PaymentStrategy::Sbp => OrderStatus::AwaitPayment,
        };
        self.store
            .replace_payment_session(ctx.order_id, new_session, to)
            .await?;

        metrics::counter!("payment_sessions_reinitialized_total").increment(1);
        Ok(StepOutcome::Continue)
    }
}
