//! Completion of a finished rental.

use std::sync::Arc;

use async_trait::async_trait;
use domain::OrderStatus;
use order_store::RentalStore;

use crate::context::{OrderContext, StepOutcome};
use crate::step::PipelineStep;
use crate::Result;

use super::guarded;

const ALLOWED: &[OrderStatus] = &[OrderStatus::Active];

/// Marks an active rental as completed when the vehicle comes back.
pub struct CompleteOrderStep {
    store: Arc<dyn RentalStore>,
}

impl CompleteOrderStep {
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PipelineStep for CompleteOrderStep {
    fn name(&self) -> &'static str {
        "complete_order"
    }

    fn allowed_statuses(&self) -> &'static [OrderStatus] {
        ALLOWED
    }

    async fn execute(&self, ctx: &OrderContext) -> Result<StepOutcome> {
        guarded(
            self.store.as_ref(),
            ctx.order_id,
            ALLOWED,
            OrderStatus::Completed,
        )
        .await?;

        metrics::counter!("orders_completed_total").increment(1);
        Ok(StepOutcome::Continue)
    }
}
