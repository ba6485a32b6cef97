//! The order row model.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId, VehicleId};
use serde::{Deserialize, Serialize};

use super::{Discount, Money, OrderStatus, RentalPeriod};

/// A persisted rental order.
///
/// The `status` field is the only part of the row the pipeline mutates;
/// everything else is written once at creation. Guarded status writes go
/// through the store so the read-check-write happens under the row lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub amount: Money,
    pub discount: Discount,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub pickup_location: String,
    pub pickup_district: String,
    pub return_location: String,
    pub return_district: String,
    /// True when the order was placed through a manager and documents
    /// will be collected over the phone.
    pub with_manager: bool,
    pub created_at: DateTime<Utc>,
    pub vehicle_id: VehicleId,
    pub user_id: UserId,
}

impl Order {
    /// Returns the rental period of this order.
    ///
    /// The period was validated at creation, so reconstructing it cannot
    /// fail for a persisted row.
    pub fn period(&self) -> RentalPeriod {
        RentalPeriod::new(self.starts_at, self.ends_at)
            .unwrap_or_else(|_| unreachable!("persisted order has a validated period"))
    }
}

/// An order that has not been persisted yet: no identity, no status,
/// no creation timestamp. The store assigns those on insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub amount: Money,
    pub discount: Discount,
    pub period: RentalPeriod,
    pub pickup_location: String,
    pub pickup_district: String,
    pub return_location: String,
    pub return_district: String,
    pub with_manager: bool,
    pub vehicle_id: VehicleId,
    pub user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

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

    #[test]
    fn period_matches_row_fields() {
        let order = sample_order();
        let period = order.period();
        assert_eq!(period.starts_at(), order.starts_at);
        assert_eq!(period.ends_at(), order.ends_at);
    }

    #[test]
    fn order_serialization_roundtrip() {
        let order = sample_order();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }
}
