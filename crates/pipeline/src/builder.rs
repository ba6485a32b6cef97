//! Canonical processing stages and the chain builder.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::step::{PipelineChain, PipelineStep};

/// The canonical ordered stages of order processing.
///
/// Being an enum, an unknown stage is unrepresentable; callers that
/// deserialize a stage from the outside fail fast at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    CheckDocuments,
    VerifyDocuments,
    ConfirmOrder,
}

impl Stage {
    /// All stages in processing order.
    pub const ORDERED: [Stage; 3] = [
        Stage::CheckDocuments,
        Stage::VerifyDocuments,
        Stage::ConfirmOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CheckDocuments => "CHECK_DOCUMENTS",
            Stage::VerifyDocuments => "VERIFY_DOCUMENTS",
            Stage::ConfirmOrder => "CONFIRM_ORDER",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds suffix chains over the canonical stage order.
///
/// `starting_at(stage)` yields the chain from that stage to the end, so a
/// failed order can resume mid-pipeline (e.g. re-verification after a
/// document fix) without repeating earlier stages.
pub struct ChainBuilder {
    check_documents: Arc<dyn PipelineStep>,
    verify_documents: Arc<dyn PipelineStep>,
    confirm_order: Arc<dyn PipelineStep>,
}

impl ChainBuilder {
    pub fn new(
        check_documents: Arc<dyn PipelineStep>,
        verify_documents: Arc<dyn PipelineStep>,
        confirm_order: Arc<dyn PipelineStep>,
    ) -> Self {
        Self {
            check_documents,
            verify_documents,
            confirm_order,
        }
    }

    fn step_for(&self, stage: Stage) -> Arc<dyn PipelineStep> {
        match stage {
            Stage::CheckDocuments => Arc::clone(&self.check_documents),
            Stage::VerifyDocuments => Arc::clone(&self.verify_documents),
            Stage::ConfirmOrder => Arc::clone(&self.confirm_order),
        }
    }

    /// Returns the chain starting at `stage` and running to the end.
    pub fn starting_at(&self, stage: Stage) -> PipelineChain {
        let steps = Stage::ORDERED
            .iter()
            .skip_while(|s| **s != stage)
            .map(|s| self.step_for(*s))
            .collect();
        PipelineChain::new(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{OrderContext, StepOutcome};
    use crate::Result;
    use async_trait::async_trait;
    use domain::OrderStatus;

    struct Named(&'static str);

    #[async_trait]
    impl PipelineStep for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn allowed_statuses(&self) -> &'static [OrderStatus] {
            &[OrderStatus::New]
        }

        async fn execute(&self, _ctx: &OrderContext) -> Result<StepOutcome> {
            Ok(StepOutcome::Continue)
        }
    }

    fn builder() -> ChainBuilder {
        ChainBuilder::new(
            Arc::new(Named("check")),
            Arc::new(Named("verify")),
            Arc::new(Named("confirm")),
        )
    }

    #[test]
    fn full_chain_from_first_stage() {
        assert_eq!(builder().starting_at(Stage::CheckDocuments).len(), 3);
    }

    #[test]
    fn suffix_from_middle_stage() {
        assert_eq!(builder().starting_at(Stage::VerifyDocuments).len(), 2);
    }

    #[test]
    fn last_stage_yields_single_step() {
        assert_eq!(builder().starting_at(Stage::ConfirmOrder).len(), 1);
    }

    #[test]
    fn stage_wire_encoding() {
        let stage: Stage = serde_json::from_str("\"VERIFY_DOCUMENTS\"").unwrap();
        assert_eq!(stage, Stage::VerifyDocuments);
        assert_eq!(Stage::ConfirmOrder.to_string(), "CONFIRM_ORDER");
    }
}
