//! Second stage: verify the customer's documents.

use std::sync::Arc;

use async_trait::async_trait;
use domain::OrderStatus;
use order_store::RentalStore;
use tracing::warn;

use crate::context::{OrderContext, StepOutcome};
use crate::notifications::{NoticeKind, NotificationDispatcher};
use crate::step::PipelineStep;
use crate::verification::{DocumentVerification, Verdict};
use crate::{PipelineError, Result};

use super::guarded;

const ALLOWED: &[OrderStatus] = &[
    OrderStatus::PaymentSuccess,
    OrderStatus::ReservationSuccess,
    OrderStatus::WithoutDocs,
    OrderStatus::VerifyFailed,
];

/// Moves the order through approval.
///
/// The order enters `OnApproval` first so a concurrent run cannot verify
/// the same order twice; the verdict then lands it in `ApprovalSuccess`
/// or `VerifyFailed`. A declined or unreachable verification is a real
/// failure, not a halt: the customer has to act before a retry makes
/// sense.
pub struct VerifyDocumentsStep {
    store: Arc<dyn RentalStore>,
    verifier: Arc<dyn DocumentVerification>,
    notifier: Arc<NotificationDispatcher>,
}

impl VerifyDocumentsStep {
    pub fn new(
        store: Arc<dyn RentalStore>,
        verifier: Arc<dyn DocumentVerification>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            verifier,
            notifier,
        }
    }

    async fn fail_verification(&self, ctx: &OrderContext, reason: String) -> PipelineError {
        match guarded(
            self.store.as_ref(),
            ctx.order_id,
            &[OrderStatus::OnApproval],
            OrderStatus::VerifyFailed,
        )
        .await
        {
            Ok(order) => {
                self.notifier
                    .notify(NoticeKind::DocumentsVerifyFailed, &order)
                    .await;
                PipelineError::VerificationFailed {
                    order_id: ctx.order_id,
                    reason,
                }
            }
            Err(err) => err,
        }
    }
}

#[async_trait]
impl PipelineStep for VerifyDocumentsStep {
    fn name(&self) -> &'static str {
        "verify_documents"
    }

    fn allowed_statuses(&self) -> &'static [OrderStatus] {
        ALLOWED
    }

    async fn execute(&self, ctx: &OrderContext) -> Result<StepOutcome> {
        let order = guarded(
            self.store.as_ref(),
            ctx.order_id,
            ALLOWED,
            OrderStatus::OnApproval,
        )
        .await?;

        match self.verifier.verify(&order).await {
            Ok(Verdict::Verified) => {
                guarded(
                    self.store.as_ref(),
                    ctx.order_id,
                    &[OrderStatus::OnApproval],
                    OrderStatus::ApprovalSuccess,
                )
                .await?;
                Ok(StepOutcome::Continue)
            }
            Ok(Verdict::Incomplete { reason }) => {
                Err(self.fail_verification(ctx, reason).await)
            }
            Err(err) => {
                warn!(order_id = %ctx.order_id, error = %err, "verification service failed");
                Err(self.fail_verification(ctx, err.to_string()).await)
            }
        }
    }
}
