//! All-or-nothing order creation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{OrderId, UserId, VehicleId};
use domain::{
    Discount, DomainError, Money, NewOrder, Order, OrderStatus, PaymentSession, PaymentStrategy,
    RentalPeriod,
};
use order_store::RentalStore;
use serde::Deserialize;
use tracing::{error, info};

use crate::calendar::BookingCalendar;
use crate::sessions::PaymentSessionManager;
use crate::steps::guarded;
use crate::{PipelineError, Result};

/// What a client submits to place an order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub vehicle_id: VehicleId,
    pub user_id: UserId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub amount: Money,
    #[serde(default)]
    pub discount: Discount,
    pub pickup_location: String,
    pub pickup_district: String,
    #[serde(default)]
    pub return_location: String,
    #[serde(default)]
    pub return_district: String,
    #[serde(default)]
    pub with_manager: bool,
    pub strategy: PaymentStrategy,
}

/// Creates orders: either the full row + payment session exist at the
/// end, or nothing does.
///
/// The range hold is held across the whole attempt and released by drop,
/// so no exit path (validation failure, gateway failure, panic) leaks a
/// reservation that never materialized.
pub struct OrderCreationService {
    store: Arc<dyn RentalStore>,
    calendar: Arc<BookingCalendar>,
    sessions: Arc<PaymentSessionManager>,
}

impl OrderCreationService {
    pub fn new(
        store: Arc<dyn RentalStore>,
        calendar: Arc<BookingCalendar>,
        sessions: Arc<PaymentSessionManager>,
    ) -> Self {
        Self {
            store,
            calendar,
            sessions,
        }
    }

    #[tracing::instrument(skip(self, request), fields(vehicle_id = %request.vehicle_id, user_id = %request.user_id))]
    pub async fn create(&self, request: CreateOrderRequest) -> Result<(Order, PaymentSession)> {
        let period = RentalPeriod::new(request.starts_at, request.ends_at)?;
        if !request.amount.is_positive() {
            return Err(DomainError::InvalidAmount(request.amount.minor_units()).into());
        }

        let _hold = self.calendar.hold(request.vehicle_id, period, None).await?;

        let order = self
            .store
            .insert_order(NewOrder {
                amount: request.amount,
                discount: request.discount,
                period,
                pickup_location: request.pickup_location,
                pickup_district: request.pickup_district,
                return_location: request.return_location,
                return_district: request.return_district,
                with_manager: request.with_manager,
                vehicle_id: request.vehicle_id,
                user_id: request.user_id,
            })
            .await?;

        let session = match self.sessions.init(&order, request.strategy).await {
            Ok(session) => session,
            Err(err) => {
                self.rollback(order.id).await;
                return Err(PipelineError::Gateway(err));
            }
        };

        if let Err(err) = self.store.insert_payment_session(session.clone()).await {
            self.rollback(order.id).await;
            return Err(err.into());
        }

        let awaiting = match request.strategy {
            PaymentStrategy::Card => OrderStatus::AwaitReservation,
            PaymentStrategy::Sbp => OrderStatus::AwaitPayment,
        };
        let order = match guarded(
            self.store.as_ref(),
            order.id,
            &[OrderStatus::New],
            awaiting,
        )
        .await
        {
            Ok(order) => order,
            Err(err) => {
                self.rollback(order.id).await;
                return Err(err);
            }
        };

        info!(order_id = %order.id, status = %order.status, "order created");
        metrics::counter!("orders_created_total").increment(1);
        Ok((order, session))
    }

    async fn rollback(&self, order_id: OrderId) {
        if let Err(err) = self.store.delete_order(order_id).await {
            // The half-created row stays behind; operators find it by id.
            error!(%order_id, error = %err, "order creation rollback failed");
        }
    }
}
