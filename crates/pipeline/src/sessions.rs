//! Payment session lifecycle management.

use std::sync::Arc;

use chrono::{Duration, SubsecRound, Utc};
use domain::{Order, PaymentSession, PaymentStrategy};

use crate::gateway::{GatewayError, PaymentGateway, PaymentInitRequest};

/// Injected payment settings. No ambient globals: everything the manager
/// needs to build a gateway request arrives at construction.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Base URL of the customer-facing frontend.
    pub frontend_host: String,

    /// Where the provider posts payment status callbacks.
    pub notification_url: String,

    /// How long a session stays payable, counted from init.
    pub session_lifetime: Duration,
}

/// Opens payment sessions against the gateway and stamps their expiry.
pub struct PaymentSessionManager {
    gateway: Arc<dyn PaymentGateway>,
    config: PaymentConfig,
}

impl PaymentSessionManager {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: PaymentConfig) -> Self {
        Self { gateway, config }
    }

    pub fn gateway(&self) -> Arc<dyn PaymentGateway> {
        Arc::clone(&self.gateway)
    }

    /// Opens a session for the order.
    ///
    /// The redirect URLs both land on the order page; the due date the
    /// provider sees is truncated to whole seconds, matching the provider
    /// API's resolution.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, strategy = ?strategy))]
    pub async fn init(
        &self,
        order: &Order,
        strategy: PaymentStrategy,
    ) -> Result<PaymentSession, GatewayError> {
        let created_at = Utc::now();
        let order_url = format!("{}/orders/{}", self.config.frontend_host, order.id);

        let request = PaymentInitRequest {
            order_id: order.id,
            amount: order.amount,
            strategy,
            pay_type: strategy.pay_type(),
            success_url: order_url.clone(),
            fail_url: order_url,
            notification_url: self.config.notification_url.clone(),
            due_at: (created_at + self.config.session_lifetime).trunc_subsecs(0),
            description: format!("Rental order {}", order.id),
        };

        let response = self.gateway.init(request).await?;
        metrics::counter!("payment_sessions_initialized_total").increment(1);

        Ok(PaymentSession {
            payment_id: response.payment_id,
            order_id: order.id,
            strategy,
            payload_type: response.payload_type,
            payload: response.payload,
            created_at,
            lifetime: self.config.session_lifetime,
        })
    }

    /// Whether the session has passed its expiry instant.
    pub fn is_expired(&self, session: &PaymentSession) -> bool {
        session.is_expired(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryPaymentGateway;
    use chrono::TimeZone;
    use common::{OrderId, UserId, VehicleId};
    use domain::{Discount, Money, OrderStatus, PayloadType};

    fn config() -> PaymentConfig {
        PaymentConfig {
            frontend_host: "https://rental.example".to_string(),
            notification_url: "https://rental.example/hooks/payment".to_string(),
            session_lifetime: Duration::seconds(7200),
        }
    }

    fn sample_order() -> Order {
        Order {
            id: OrderId::new(),
            status: OrderStatus::New,
            amount: Money::from_minor_units(500_000),
            discount: Discount::None,
            starts_at: Utc.with_ymd_and_hms(2026, 7, 1, 10, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 7, 3, 10, 0, 0).unwrap(),
            pickup_location: "Main st. 1".to_string(),
            pickup_district: "CENTER".to_string(),
            return_location: String::new(),
            return_district: "PICKUP".to_string(),
            with_manager: false,
            created_at: Utc::now(),
            vehicle_id: VehicleId::new(),
            user_id: UserId::new(),
        }
    }

    #[tokio::test]
    async fn init_maps_gateway_response_into_session() {
        let manager = PaymentSessionManager::new(Arc::new(InMemoryPaymentGateway::new()), config());
        let order = sample_order();

        let session = manager.init(&order, PaymentStrategy::Card).await.unwrap();

        assert_eq!(session.order_id, order.id);
        assert_eq!(session.strategy, PaymentStrategy::Card);
        assert_eq!(session.payload_type, PayloadType::PaymentUrl);
        assert_eq!(session.lifetime, Duration::seconds(7200));
        assert!(!manager.is_expired(&session));
    }

    #[tokio::test]
    async fn init_failure_propagates() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_init(true).await;
        let manager = PaymentSessionManager::new(Arc::new(gateway), config());

        let err = manager
            .init(&sample_order(), PaymentStrategy::Sbp)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
    }
}
