//! Payment gateway port and the in-memory test double.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Money, PayType, PayloadType, PaymentId, PaymentStrategy};
use thiserror::Error;
use tokio::sync::RwLock;

/// Gateway failures.
///
/// `Rejected` keeps the raw provider response so operators can see what
/// the provider actually said; the wire protocol itself stays behind the
/// trait.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Transport(String),

    #[error("gateway rejected the request: {message}")]
    Rejected {
        message: String,
        raw: Option<String>,
    },
}

/// Everything the provider needs to open a payment session.
#[derive(Debug, Clone)]
pub struct PaymentInitRequest {
    pub order_id: OrderId,
    pub amount: Money,
    pub strategy: PaymentStrategy,
    pub pay_type: PayType,
    pub success_url: String,
    pub fail_url: String,
    pub notification_url: String,
    pub due_at: DateTime<Utc>,
    pub description: String,
}

/// What the provider returns for an opened session.
#[derive(Debug, Clone)]
pub struct PaymentInitResponse {
    pub payment_id: PaymentId,
    pub payload_type: PayloadType,
    pub payload: String,
}

/// Port to the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment session and returns what the client needs to pay.
    async fn init(&self, request: PaymentInitRequest) -> Result<PaymentInitResponse, GatewayError>;

    /// Voids a session, releasing any reserved funds.
    async fn cancel(&self, payment_id: &PaymentId) -> Result<(), GatewayError>;

    /// Captures a previously reserved (two-stage) payment.
    async fn confirm(&self, payment_id: &PaymentId) -> Result<(), GatewayError>;
}

#[derive(Default)]
struct GatewayState {
    next_id: u64,
    fail_on_init: bool,
    fail_on_cancel: bool,
    fail_on_confirm: bool,
    initialized: Vec<PaymentId>,
    confirmed: Vec<PaymentId>,
    canceled: Vec<PaymentId>,
}

/// In-memory gateway for tests and the demo server.
///
/// Issues sequential `PAY-0001`-style identifiers and records every
/// confirm/cancel so tests can assert on provider-side effects. Each
/// operation can be made to fail via the `set_fail_on_*` switches.
#[derive(Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_init(&self, fail: bool) {
        self.state.write().await.fail_on_init = fail;
    }

    pub async fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().await.fail_on_cancel = fail;
    }

    pub async fn set_fail_on_confirm(&self, fail: bool) {
        self.state.write().await.fail_on_confirm = fail;
    }

    pub async fn initialized(&self) -> Vec<PaymentId> {
        self.state.read().await.initialized.clone()
    }

    pub async fn confirmed(&self) -> Vec<PaymentId> {
        self.state.read().await.confirmed.clone()
    }

    pub async fn canceled(&self) -> Vec<PaymentId> {
        self.state.read().await.canceled.clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn init(&self, request: PaymentInitRequest) -> Result<PaymentInitResponse, GatewayError> {
        let mut state = self.state.write().await;
        if state.fail_on_init {
            return Err(GatewayError::Rejected {
                message: "session init declined".to_string(),
                raw: Some(r#"{"Success":false,"ErrorCode":"99"}"#.to_string()),
            });
        }

        state.next_id += 1;
        let payment_id = PaymentId::new(format!("PAY-{:04}", state.next_id));
        state.initialized.push(payment_id.clone());

        let (payload_type, payload) = match request.strategy {
            PaymentStrategy::Card => (
                PayloadType::PaymentUrl,
                format!("https://pay.example/form/{payment_id}"),
            ),
            PaymentStrategy::Sbp => (
                PayloadType::QrUrl,
                format!("https://pay.example/qr/{payment_id}"),
            ),
        };

        Ok(PaymentInitResponse {
            payment_id,
            payload_type,
            payload,
        })
    }

    async fn cancel(&self, payment_id: &PaymentId) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        if state.fail_on_cancel {
            return Err(GatewayError::Transport("cancel timed out".to_string()));
        }
        state.canceled.push(payment_id.clone());
        Ok(())
    }

    async fn confirm(&self, payment_id: &PaymentId) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        if state.fail_on_confirm {
            return Err(GatewayError::Rejected {
                message: "confirm declined".to_string(),
                raw: Some(r#"{"Success":false,"ErrorCode":"1051"}"#.to_string()),
            });
        }
        state.confirmed.push(payment_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(strategy: PaymentStrategy) -> PaymentInitRequest {
        PaymentInitRequest {
            order_id: OrderId::new(),
            amount: Money::from_minor_units(500_000),
            strategy,
            pay_type: strategy.pay_type(),
            success_url: "https://rental.example/orders/1".to_string(),
            fail_url: "https://rental.example/orders/1".to_string(),
            notification_url: "https://rental.example/hooks/payment".to_string(),
            due_at: Utc::now() + Duration::hours(2),
            description: "Rental order".to_string(),
        }
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let gateway = InMemoryPaymentGateway::new();
        let first = gateway.init(request(PaymentStrategy::Card)).await.unwrap();
        let second = gateway.init(request(PaymentStrategy::Sbp)).await.unwrap();

        assert_eq!(first.payment_id.as_str(), "PAY-0001");
        assert_eq!(second.payment_id.as_str(), "PAY-0002");
    }

    #[tokio::test]
    async fn payload_type_follows_strategy() {
        let gateway = InMemoryPaymentGateway::new();
        let card = gateway.init(request(PaymentStrategy::Card)).await.unwrap();
        let sbp = gateway.init(request(PaymentStrategy::Sbp)).await.unwrap();

        assert_eq!(card.payload_type, PayloadType::PaymentUrl);
        assert_eq!(sbp.payload_type, PayloadType::QrUrl);
    }

    #[tokio::test]
    async fn failure_switch_rejects_init() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_init(true).await;

        let err = gateway.init(request(PaymentStrategy::Card)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
        assert!(gateway.initialized().await.is_empty());
    }

    #[tokio::test]
    async fn confirm_and_cancel_are_recorded() {
        let gateway = InMemoryPaymentGateway::new();
        let id = PaymentId::new("PAY-0042");

        gateway.confirm(&id).await.unwrap();
        gateway.cancel(&id).await.unwrap();

        assert_eq!(gateway.confirmed().await, vec![id.clone()]);
        assert_eq!(gateway.canceled().await, vec![id]);
    }
}
