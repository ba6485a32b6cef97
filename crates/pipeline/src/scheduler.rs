//! In-process pipeline scheduling.

use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::builder::{ChainBuilder, Stage};
use crate::context::OrderContext;
use crate::step::ChainOutcome;
use crate::{PipelineError, Result};

/// Port through which callers hand an order to the pipeline.
#[async_trait]
pub trait PipelineScheduler: Send + Sync {
    async fn enqueue(&self, order_id: OrderId, stage: Stage) -> Result<()>;
}

/// Cheap clonable handle feeding the worker's channel.
#[derive(Clone)]
pub struct ChannelScheduler {
    tx: mpsc::UnboundedSender<(OrderId, Stage)>,
}

#[async_trait]
impl PipelineScheduler for ChannelScheduler {
    async fn enqueue(&self, order_id: OrderId, stage: Stage) -> Result<()> {
        self.tx
            .send((order_id, stage))
            .map_err(|_| PipelineError::MissingResult {
                detail: "pipeline worker is not running".to_string(),
            })
    }
}

/// Drains the work channel, one chain invocation per item.
///
/// Delivery is at-least-once: a redelivered item hits the status guard
/// inside its first step and comes back as `InvalidState`, which the
/// worker logs as a no-op rather than a failure.
pub struct PipelineWorker {
    builder: Arc<ChainBuilder>,
    rx: mpsc::UnboundedReceiver<(OrderId, Stage)>,
}

impl PipelineWorker {
    pub fn new(builder: Arc<ChainBuilder>) -> (ChannelScheduler, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelScheduler { tx }, Self { builder, rx })
    }

    /// Runs until every scheduler handle is dropped.
    pub async fn run(mut self) {
        while let Some((order_id, stage)) = self.rx.recv().await {
            let chain = self.builder.starting_at(stage);
            let ctx = OrderContext::new(order_id);

            match chain.invoke(&ctx).await {
                Ok(ChainOutcome::Completed) => {
                    info!(%order_id, %stage, "pipeline run completed");
                }
                Ok(ChainOutcome::Halted { step, reason }) => {
                    info!(%order_id, %stage, step, reason, "pipeline run halted");
                }
                Err(PipelineError::InvalidState { current, .. }) => {
                    info!(%order_id, %stage, %current, "redundant delivery, order already moved on");
                }
                Err(err) => {
                    error!(%order_id, %stage, error = %err, "pipeline run failed");
                }
            }
        }
    }
}
