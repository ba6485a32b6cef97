//! In-memory store implementation for testing and the demo server.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, VehicleId};
use domain::{NewOrder, Order, OrderStatus, PaymentSession, RentalPeriod};
use tokio::sync::RwLock;

use crate::store::RentalStore;
use crate::{Result, StoreError};

#[derive(Default)]
struct Inner {
    orders: HashMap<OrderId, Order>,
    sessions: HashMap<OrderId, PaymentSession>,
    /// Every status an order has held, in write order. Test observability.
    history: HashMap<OrderId, Vec<OrderStatus>>,
}

/// In-memory [`RentalStore`] implementation.
///
/// All mutations happen under a single write lock, which gives the same
/// atomicity guarantees the PostgreSQL implementation gets from row locks
/// and transactions.
#[derive(Clone, Default)]
pub struct InMemoryRentalStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryRentalStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    /// Returns the number of stored payment sessions.
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Returns every status the order has held, oldest first.
    pub async fn status_history(&self, id: OrderId) -> Vec<OrderStatus> {
        self.inner
            .read()
            .await
            .history
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RentalStore for InMemoryRentalStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let row = Order {
            id: OrderId::new(),
            status: OrderStatus::New,
            amount: order.amount,
            discount: order.discount,
            starts_at: order.period.starts_at(),
            ends_at: order.period.ends_at(),
            pickup_location: order.pickup_location,
            pickup_district: order.pickup_district,
            return_location: order.return_location,
            return_district: order.return_district,
            with_manager: order.with_manager,
            created_at: Utc::now(),
            vehicle_id: order.vehicle_id,
            user_id: order.user_id,
        };

        let mut inner = self.inner.write().await;
        inner.history.insert(row.id, vec![row.status]);
        inner.orders.insert(row.id, row.clone());
        Ok(row)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .orders
            .remove(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        inner.sessions.remove(&id);
        inner.history.remove(&id);
        Ok(())
    }

    async fn transition(
        &self,
        id: OrderId,
        allowed: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Order> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        if !allowed.contains(&order.status) {
            return Err(StoreError::GuardRejected {
                order_id: id,
                current: order.status,
            });
        }

        order.status = to;
        let updated = order.clone();
        inner.history.entry(id).or_default().push(to);
        Ok(updated)
    }

    async fn orders_overlapping(
        &self,
        vehicle_id: VehicleId,
        period: RentalPeriod,
        excluding: Option<OrderId>,
    ) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .filter(|o| o.vehicle_id == vehicle_id)
            .filter(|o| Some(o.id) != excluding)
            .filter(|o| o.status.holds_rental_period())
            .filter(|o| o.period().overlaps(&period))
            .cloned()
            .collect())
    }

    async fn insert_payment_session(&self, session: PaymentSession) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&session.order_id) {
            return Err(StoreError::DuplicateSession(session.payment_id));
        }
        inner.sessions.insert(session.order_id, session);
        Ok(())
    }

    async fn payment_session(&self, order_id: OrderId) -> Result<Option<PaymentSession>> {
        Ok(self.inner.read().await.sessions.get(&order_id).cloned())
    }

    async fn replace_payment_session(
        &self,
        order_id: OrderId,
        session: PaymentSession,
        new_status: OrderStatus,
    ) -> Result<Order> {
        let mut inner = self.inner.write().await;

        if !inner.orders.contains_key(&order_id) {
            return Err(StoreError::OrderNotFound(order_id));
        }
        if !inner.sessions.contains_key(&order_id) {
            return Err(StoreError::SessionNotFound(order_id));
        }

        // All checks passed: apply the swap as one unit under the lock.
        inner.sessions.insert(order_id, session);
        let order = inner
            .orders
            .get_mut(&order_id)
            .unwrap_or_else(|| unreachable!("existence checked above"));
        order.status = new_status;
        let updated = order.clone();
        inner.history.entry(order_id).or_default().push(new_status);
        Ok(updated)
    }

    async fn activate_due_orders(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let due: Vec<OrderId> = inner
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Booked && o.starts_at <= now)
            .map(|o| o.id)
            .collect();

        for id in &due {
            if let Some(order) = inner.orders.get_mut(id) {
                order.status = OrderStatus::Active;
            }
            inner.history.entry(*id).or_default().push(OrderStatus::Active);
        }
        Ok(due.len() as u64)
    }

    async fn expire_stale_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let stale: Vec<OrderId> = inner
            .orders
            .values()
            .filter(|o| {
                matches!(
                    o.status,
                    OrderStatus::AwaitPayment | OrderStatus::AwaitReservation
                )
            })
            .filter(|o| {
                inner
                    .sessions
                    .get(&o.id)
                    .is_some_and(|s| s.is_expired(now))
            })
            .map(|o| o.id)
            .collect();

        for id in &stale {
            if let Some(order) = inner.orders.get_mut(id) {
                order.status = OrderStatus::PaymentSessionExpired;
            }
            inner
                .history
                .entry(*id)
                .or_default()
                .push(OrderStatus::PaymentSessionExpired);
        }
        Ok(stale.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use common::UserId;
    use domain::{Discount, Money, PayloadType, PaymentId, PaymentStrategy};

    fn ts(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, day, h, 0, 0).unwrap()
    }

    fn new_order(vehicle_id: VehicleId, day: u32) -> NewOrder {
        NewOrder {
            amount: Money::from_minor_units(500_000),
            discount: Discount::None,
            period: RentalPeriod::new(ts(day, 10), ts(day + 2, 10)).unwrap(),
            pickup_location: "Main st. 1".to_string(),
            pickup_district: "CENTER".to_string(),
            return_location: String::new(),
            return_district: "PICKUP".to_string(),
            with_manager: false,
            vehicle_id,
            user_id: UserId::new(),
        }
    }

    fn session_for(order_id: OrderId, payment_id: &str, created_at: DateTime<Utc>) -> PaymentSession {
        PaymentSession {
            payment_id: PaymentId::new(payment_id),
            order_id,
            strategy: PaymentStrategy::Card,
            payload_type: PayloadType::PaymentUrl,
            payload: format!("https://pay.example/form/{payment_id}"),
            created_at,
            lifetime: Duration::seconds(7200),
        }
    }

    #[tokio::test]
    async fn insert_assigns_identity_and_new_status() {
        let store = InMemoryRentalStore::new();
        let order = store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(store.order_count().await, 1);
        assert_eq!(
            store.status_history(order.id).await,
            vec![OrderStatus::New]
        );
    }

    #[tokio::test]
    async fn transition_rejects_disallowed_status_without_mutation() {
        let store = InMemoryRentalStore::new();
        let order = store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();

        let err = store
            .transition(order.id, &[OrderStatus::Active], OrderStatus::Completed)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::GuardRejected {
                current: OrderStatus::New,
                ..
            }
        ));
        let unchanged = store.order(order.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, OrderStatus::New);
        assert_eq!(
            store.status_history(order.id).await,
            vec![OrderStatus::New]
        );
    }

    #[tokio::test]
    async fn transition_applies_when_guard_holds() {
        let store = InMemoryRentalStore::new();
        let order = store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();

        let updated = store
            .transition(order.id, &[OrderStatus::New], OrderStatus::AwaitPayment)
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::AwaitPayment);
        assert_eq!(
            store.status_history(order.id).await,
            vec![OrderStatus::New, OrderStatus::AwaitPayment]
        );
    }

    #[tokio::test]
    async fn overlap_query_ignores_released_orders() {
        let store = InMemoryRentalStore::new();
        let vehicle = VehicleId::new();
        let order = store.insert_order(new_order(vehicle, 1)).await.unwrap();

        let period = RentalPeriod::new(ts(2, 0), ts(2, 12)).unwrap();
        assert_eq!(
            store
                .orders_overlapping(vehicle, period, None)
                .await
                .unwrap()
                .len(),
            1
        );

        store
            .transition(order.id, &[OrderStatus::New], OrderStatus::Canceled)
            .await
            .unwrap();
        assert!(store
            .orders_overlapping(vehicle, period, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn overlap_query_excludes_named_order_and_other_vehicles() {
        let store = InMemoryRentalStore::new();
        let vehicle = VehicleId::new();
        let order = store.insert_order(new_order(vehicle, 1)).await.unwrap();
        store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();

        let period = RentalPeriod::new(ts(1, 12), ts(2, 12)).unwrap();
        assert!(store
            .orders_overlapping(vehicle, period, Some(order.id))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delete_order_removes_its_payment_session() {
        let store = InMemoryRentalStore::new();
        let order = store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();
        store
            .insert_payment_session(session_for(order.id, "PAY-1", Utc::now()))
            .await
            .unwrap();

        store.delete_order(order.id).await.unwrap();

        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_session_insert_is_rejected() {
        let store = InMemoryRentalStore::new();
        let order = store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();

        store
            .insert_payment_session(session_for(order.id, "PAY-1", Utc::now()))
            .await
            .unwrap();
        let err = store
            .insert_payment_session(session_for(order.id, "PAY-2", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSession(_)));
    }

    #[tokio::test]
    async fn replace_swaps_session_and_status_together() {
        let store = InMemoryRentalStore::new();
        let order = store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();
        store
            .insert_payment_session(session_for(order.id, "PAY-1", Utc::now()))
            .await
            .unwrap();

        let updated = store
            .replace_payment_session(
                order.id,
                session_for(order.id, "PAY-2", Utc::now()),
                OrderStatus::AwaitReservation,
            )
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::AwaitReservation);
        let session = store.payment_session(order.id).await.unwrap().unwrap();
        assert_eq!(session.payment_id.as_str(), "PAY-2");
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn replace_without_existing_session_fails_cleanly() {
        let store = InMemoryRentalStore::new();
        let order = store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();

        let err = store
            .replace_payment_session(
                order.id,
                session_for(order.id, "PAY-2", Utc::now()),
                OrderStatus::AwaitPayment,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::SessionNotFound(_)));
        assert!(store.payment_session(order.id).await.unwrap().is_none());
        let unchanged = store.order(order.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, OrderStatus::New);
    }

    #[tokio::test]
    async fn activate_due_orders_only_touches_started_booked() {
        let store = InMemoryRentalStore::new();
        let started = store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();
        let future = store
            .insert_order(new_order(VehicleId::new(), 20))
            .await
            .unwrap();
        for id in [started.id, future.id] {
            store
                .transition(id, &[OrderStatus::New], OrderStatus::Booked)
                .await
                .unwrap();
        }

        let count = store.activate_due_orders(ts(2, 0)).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(
            store.order(started.id).await.unwrap().unwrap().status,
            OrderStatus::Active
        );
        assert_eq!(
            store.order(future.id).await.unwrap().unwrap().status,
            OrderStatus::Booked
        );
    }

    #[tokio::test]
    async fn expire_stale_sessions_checks_status_and_expiry() {
        let store = InMemoryRentalStore::new();
        let stale = store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();
        let fresh = store
            .insert_order(new_order(VehicleId::new(), 1))
            .await
            .unwrap();

        let now = Utc::now();
        store
            .insert_payment_session(session_for(stale.id, "PAY-1", now - Duration::hours(3)))
            .await
            .unwrap();
        store
            .insert_payment_session(session_for(fresh.id, "PAY-2", now))
            .await
            .unwrap();
        for id in [stale.id, fresh.id] {
            store
                .transition(id, &[OrderStatus::New], OrderStatus::AwaitPayment)
                .await
                .unwrap();
        }

        let count = store.expire_stale_sessions(now).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(
            store.order(stale.id).await.unwrap().unwrap().status,
            OrderStatus::PaymentSessionExpired
        );
        assert_eq!(
            store.order(fresh.id).await.unwrap().unwrap().status,
            OrderStatus::AwaitPayment
        );
    }
}
