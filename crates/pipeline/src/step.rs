//! The step trait and the chain that runs steps in order.

use std::sync::Arc;

use async_trait::async_trait;
use domain::OrderStatus;
use tracing::{debug, info};

use crate::context::{OrderContext, StepOutcome};
use crate::{PipelineError, Result};

/// One stage of the order lifecycle.
///
/// A step owns its guard: `allowed_statuses` documents which statuses the
/// step accepts, but enforcement happens inside `execute` through
/// [`order_store::RentalStore::transition`], so the check and the write
/// are a single atomic unit against the store.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Stable step name, used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Statuses this step may start from.
    fn allowed_statuses(&self) -> &'static [OrderStatus];

    /// Whether the step accepts an order currently in `status`.
    fn check_guard(&self, status: OrderStatus) -> bool {
        self.allowed_statuses().contains(&status)
    }

    async fn execute(&self, ctx: &OrderContext) -> Result<StepOutcome>;
}

/// How a chain invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every step ran and returned `Continue`.
    Completed,

    /// A step stopped the chain without error.
    Halted {
        step: &'static str,
        reason: &'static str,
    },
}

/// An ordered list of steps invoked front to back.
pub struct PipelineChain {
    steps: Vec<Arc<dyn PipelineStep>>,
}

impl PipelineChain {
    pub fn new(steps: Vec<Arc<dyn PipelineStep>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the chain for one order.
    ///
    /// `Continue` advances to the next step, `Halted` stops cleanly, and
    /// an error propagates after the failing step has already written its
    /// compensating status. An empty chain is an orchestration bug and
    /// fails with [`PipelineError::MissingResult`].
    #[tracing::instrument(skip(self, ctx), fields(order_id = %ctx.order_id, steps = self.steps.len()))]
    pub async fn invoke(&self, ctx: &OrderContext) -> Result<ChainOutcome> {
        if self.steps.is_empty() {
            return Err(PipelineError::MissingResult {
                detail: "chain has no steps".to_string(),
            });
        }

        for step in &self.steps {
            debug!(step = step.name(), "executing pipeline step");
            metrics::counter!("pipeline_steps_total", "step" => step.name()).increment(1);

            match step.execute(ctx).await {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Halted { reason }) => {
                    info!(step = step.name(), reason, "pipeline halted");
                    metrics::counter!("pipeline_halts_total", "step" => step.name()).increment(1);
                    return Ok(ChainOutcome::Halted {
                        step: step.name(),
                        reason,
                    });
                }
                Err(err) => {
                    metrics::counter!("pipeline_failures_total", "step" => step.name())
                        .increment(1);
                    return Err(err);
                }
            }
        }

        Ok(ChainOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;

    struct StubStep {
        name: &'static str,
        outcome: StepOutcome,
    }

    #[async_trait]
    impl PipelineStep for StubStep {
        fn name(&self) -> &'static str {
            self.name
        }

        fn allowed_statuses(&self) -> &'static [OrderStatus] {
            &[OrderStatus::New]
        }

        async fn execute(&self, _ctx: &OrderContext) -> Result<StepOutcome> {
            Ok(self.outcome)
        }
    }

    struct FailingStep;

    #[async_trait]
    impl PipelineStep for FailingStep {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn allowed_statuses(&self) -> &'static [OrderStatus] {
            &[OrderStatus::New]
        }

        async fn execute(&self, ctx: &OrderContext) -> Result<StepOutcome> {
            Err(PipelineError::OrderNotFound(ctx.order_id))
        }
    }

    fn continuing(name: &'static str) -> Arc<dyn PipelineStep> {
        Arc::new(StubStep {
            name,
            outcome: StepOutcome::Continue,
        })
    }

    #[tokio::test]
    async fn empty_chain_is_an_orchestration_bug() {
        let chain = PipelineChain::new(Vec::new());
        let ctx = OrderContext::new(OrderId::new());

        let err = chain.invoke(&ctx).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingResult { .. }));
    }

    #[tokio::test]
    async fn chain_runs_all_continuing_steps() {
        let chain = PipelineChain::new(vec![continuing("a"), continuing("b"), continuing("c")]);
        let ctx = OrderContext::new(OrderId::new());

        let outcome = chain.invoke(&ctx).await.unwrap();
        assert_eq!(outcome, ChainOutcome::Completed);
    }

    #[tokio::test]
    async fn halt_stops_the_chain_cleanly() {
        let halting: Arc<dyn PipelineStep> = Arc::new(StubStep {
            name: "halting",
            outcome: StepOutcome::Halted {
                reason: "waiting on documents",
            },
        });
        let chain = PipelineChain::new(vec![continuing("a"), halting, continuing("c")]);
        let ctx = OrderContext::new(OrderId::new());

        let outcome = chain.invoke(&ctx).await.unwrap();
        assert_eq!(
            outcome,
            ChainOutcome::Halted {
                step: "halting",
                reason: "waiting on documents",
            }
        );
    }

    #[tokio::test]
    async fn step_error_propagates() {
        let chain = PipelineChain::new(vec![continuing("a"), Arc::new(FailingStep)]);
        let ctx = OrderContext::new(OrderId::new());

        let err = chain.invoke(&ctx).await.unwrap_err();
        assert!(matches!(err, PipelineError::OrderNotFound(_)));
    }
}
