//! User-facing notifications with at-least-once-safe dispatch.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::Order;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// The user-facing notices the pipeline emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// Manager-assisted order is parked waiting for documents.
    OrderWithoutDocs,

    /// Document verification declined the order.
    DocumentsVerifyFailed,

    /// The order is booked.
    OrderConfirmed,

    /// The order was canceled.
    OrderCanceled,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::OrderWithoutDocs => "ORDER_WITHOUT_DOCS",
            NoticeKind::DocumentsVerifyFailed => "DOCUMENTS_VERIFY_FAILED",
            NoticeKind::OrderConfirmed => "ORDER_CONFIRMED",
            NoticeKind::OrderCanceled => "ORDER_CANCELED",
        }
    }
}

impl std::fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Port to whatever actually reaches the user (email, push, SMS).
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send(&self, kind: NoticeKind, order: &Order) -> Result<(), NotifyError>;
}

/// Dispatcher the pipeline talks to.
///
/// Notifications are fire-and-forget: a delivery failure is logged and
/// swallowed, never fails the step. Redelivered pipeline work must not
/// spam the user, so each `(order, kind)` pair is sent at most once per
/// process lifetime.
pub struct NotificationDispatcher {
    port: Arc<dyn NotificationPort>,
    delivered: Mutex<HashSet<(OrderId, NoticeKind)>>,
}

impl NotificationDispatcher {
    pub fn new(port: Arc<dyn NotificationPort>) -> Self {
        Self {
            port,
            delivered: Mutex::new(HashSet::new()),
        }
    }

    pub async fn notify(&self, kind: NoticeKind, order: &Order) {
        {
            let mut delivered = self.delivered.lock().await;
            if !delivered.insert((order.id, kind)) {
                debug!(order_id = %order.id, notice = %kind, "notice already sent, skipping");
                return;
            }
        }

        if let Err(err) = self.port.send(kind, order).await {
            warn!(order_id = %order.id, notice = %kind, error = %err, "notification delivery failed");
            metrics::counter!("notifications_failed_total").increment(1);
        } else {
            metrics::counter!("notifications_sent_total", "kind" => kind.as_str()).increment(1);
        }
    }
}

/// Production default: notices land in the log stream.
#[derive(Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationPort for TracingNotifier {
    async fn send(&self, kind: NoticeKind, order: &Order) -> Result<(), NotifyError> {
        info!(order_id = %order.id, user_id = %order.user_id, notice = %kind, "user notice");
        Ok(())
    }
}

#[derive(Default)]
struct RecorderState {
    sent: Vec<(OrderId, NoticeKind)>,
    fail: bool,
}

/// Test port that records everything it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<RwLock<RecorderState>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(OrderId, NoticeKind)> {
        self.state.read().await.sent.clone()
    }

    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn send(&self, kind: NoticeKind, order: &Order) -> Result<(), NotifyError> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(NotifyError::Delivery("recorder set to fail".to_string()));
        }
        state.sent.push((order.id, kind));
        Ok(())
    }
}
