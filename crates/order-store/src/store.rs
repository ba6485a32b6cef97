use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, VehicleId};
use domain::{NewOrder, Order, OrderStatus, PaymentSession, RentalPeriod};

use crate::Result;

/// Core trait for order storage implementations.
///
/// All implementations must be thread-safe (`Send + Sync`) and must make
/// [`transition`](RentalStore::transition) and
/// [`replace_payment_session`](RentalStore::replace_payment_session)
/// atomic: concurrent callers observe either the state before the call or
/// the state after it, never a half-applied write.
#[async_trait]
pub trait RentalStore: Send + Sync {
    /// Persists a new order, assigning its identity and creation
    /// timestamp. The order starts in [`OrderStatus::New`].
    async fn insert_order(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order by ID. Returns `None` if it does not exist.
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Deletes an order row along with its payment session, if any.
    ///
    /// Only used to roll back a creation that failed partway through;
    /// established orders are canceled, never deleted.
    async fn delete_order(&self, id: OrderId) -> Result<()>;

    /// Atomically re-checks that the order's current status is in
    /// `allowed` and writes `to`, returning the updated row.
    ///
    /// Fails with [`StoreError::GuardRejected`](crate::StoreError) and
    /// performs no mutation when the guard does not hold. This is the
    /// single-writer discipline every pipeline step routes its status
    /// writes through; the guard is evaluated at write time, under the
    /// row lock, not earlier.
    async fn transition(
        &self,
        id: OrderId,
        allowed: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Order>;

    /// Returns the orders for `vehicle_id` whose period overlaps `period`
    /// and whose status still holds the rental period.
    ///
    /// `excluding` removes one order from consideration (availability
    /// checks for an existing order's own dates).
    async fn orders_overlapping(
        &self,
        vehicle_id: VehicleId,
        period: RentalPeriod,
        excluding: Option<OrderId>,
    ) -> Result<Vec<Order>>;

    /// Persists a payment session for its order.
    ///
    /// Fails with `DuplicateSession` if the order already has one;
    /// replacing a session goes through
    /// [`replace_payment_session`](RentalStore::replace_payment_session).
    async fn insert_payment_session(&self, session: PaymentSession) -> Result<()>;

    /// Loads the payment session of an order, if any.
    async fn payment_session(&self, order_id: OrderId) -> Result<Option<PaymentSession>>;

    /// Atomically deletes the order's current session, inserts `session`
    /// in its place and writes `new_status` — the reinitialization swap.
    ///
    /// Either all three happen or none do; the original session survives
    /// any failure unchanged.
    async fn replace_payment_session(
        &self,
        order_id: OrderId,
        session: PaymentSession,
        new_status: OrderStatus,
    ) -> Result<Order>;

    /// Bulk-transitions `Booked` orders whose rental has started
    /// (`starts_at <= now`) to `Active`. Returns the number of orders
    /// activated.
    async fn activate_due_orders(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Bulk-transitions orders still awaiting payment or reservation
    /// whose payment session has expired to `PaymentSessionExpired`.
    /// Returns the number of orders expired.
    async fn expire_stale_sessions(&self, now: DateTime<Utc>) -> Result<u64>;
}
