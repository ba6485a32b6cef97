//! Inbound status notices from the payment gateway.

use std::sync::Arc;

use common::OrderId;
use domain::{OrderStatus, PaymentId};
use order_store::RentalStore;
use serde::Deserialize;
use tracing::{info, warn};

use crate::Result;
use crate::builder::Stage;
use crate::scheduler::PipelineScheduler;
use crate::steps::{guarded, load_session};

/// Gateway-reported payment outcomes the handler acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayNoticeStatus {
    /// Funds are reserved (two-stage) or received (single-stage).
    Authorized,

    /// The gateway declined the payment.
    Rejected,

    /// The client never paid before the session's deadline.
    DeadlineExpired,
}

/// One callback delivery from the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayNotice {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub status: GatewayNoticeStatus,
}

const AWAITING: &[OrderStatus] = &[OrderStatus::AwaitPayment, OrderStatus::AwaitReservation];

/// Applies gateway callbacks to orders.
///
/// An authorized payment hands the order to the pipeline worker starting
/// at the document checks. A rejection or a missed payment deadline
/// writes the matching dead-end status, from which reinitialization can
/// recover the order. A notice whose payment id does not match the
/// order's current session is stale (the session was replaced since the
/// gateway sent it) and is dropped without touching the order.
pub struct GatewayNoticeHandler {
    store: Arc<dyn RentalStore>,
    scheduler: Arc<dyn PipelineScheduler>,
}

impl GatewayNoticeHandler {
    pub fn new(store: Arc<dyn RentalStore>, scheduler: Arc<dyn PipelineScheduler>) -> Self {
        Self { store, scheduler }
    }

    #[tracing::instrument(skip(self, notice), fields(order_id = %notice.order_id, payment_id = %notice.payment_id))]
    pub async fn handle(&self, notice: GatewayNotice) -> Result<()> {
        let session = load_session(self.store.as_ref(), notice.order_id).await?;
        if session.payment_id != notice.payment_id {
            warn!(current = %session.payment_id, "stale gateway notice dropped");
            metrics::counter!("gateway_notices_total", "outcome" => "stale").increment(1);
            return Ok(());
        }

        match notice.status {
            GatewayNoticeStatus::Authorized => {
                self.scheduler
                    .enqueue(notice.order_id, Stage::CheckDocuments)
                    .await?;
                info!("authorized payment queued for processing");
            }
            GatewayNoticeStatus::Rejected => {
                guarded(
                    self.store.as_ref(),
                    notice.order_id,
                    AWAITING,
                    OrderStatus::Rejected,
                )
                .await?;
                info!("payment rejected by the gateway");
            }
            GatewayNoticeStatus::DeadlineExpired => {
                guarded(
                    self.store.as_ref(),
                    notice.order_id,
                    AWAITING,
                    OrderStatus::PaymentSessionExpired,
                )
                .await?;
                info!("payment deadline passed unpaid");
            }
        }

        metrics::counter!("gateway_notices_total", "outcome" => "applied").increment(1);
        Ok(())
    }
}
