//! Vehicle availability and temporary range holds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use common::{OrderId, VehicleId};
use domain::RentalPeriod;
use order_store::RentalStore;
use tracing::debug;

use crate::{PipelineError, Result};

#[derive(Debug)]
struct TempHold {
    vehicle_id: VehicleId,
    period: RentalPeriod,
}

#[derive(Debug, Default)]
struct HoldTable {
    next_id: u64,
    holds: HashMap<u64, TempHold>,
}

/// Availability view over committed orders plus live temporary holds.
///
/// A hold reserves a vehicle's date range for the duration of an order
/// creation attempt. Holds live in process memory only; the committed
/// rows in the store are the durable reservation record.
pub struct BookingCalendar {
    store: Arc<dyn RentalStore>,
    table: Arc<Mutex<HoldTable>>,
}

fn lock_table(table: &Mutex<HoldTable>) -> MutexGuard<'_, HoldTable> {
    match table.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl BookingCalendar {
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self {
            store,
            table: Arc::new(Mutex::new(HoldTable::default())),
        }
    }

    /// Places a temporary hold on the vehicle's date range.
    ///
    /// The hold is inserted before committed orders are consulted, so two
    /// concurrent attempts for the same range cannot both pass the check:
    /// whichever inserts second sees the first hold and fails. On any
    /// conflict the hold is removed before returning.
    ///
    /// `excluding` removes one committed order from the check, for an
    /// existing order re-claiming its own dates.
    pub async fn hold(
        &self,
        vehicle_id: VehicleId,
        period: RentalPeriod,
        excluding: Option<OrderId>,
    ) -> Result<RangeHold> {
        let id = {
            let mut table = lock_table(&self.table);
            let conflict = table
                .holds
                .values()
                .any(|h| h.vehicle_id == vehicle_id && h.period.overlaps(&period));
            if conflict {
                return Err(unavailable(vehicle_id, period));
            }
            table.next_id += 1;
            let id = table.next_id;
            table.holds.insert(id, TempHold { vehicle_id, period });
            id
        };

        // Dropping the guard on the error path below releases the hold.
        let guard = RangeHold {
            table: Arc::clone(&self.table),
            id,
        };

        let committed = self
            .store
            .orders_overlapping(vehicle_id, period, excluding)
            .await?;
        if !committed.is_empty() {
            debug!(%vehicle_id, %period, "range taken by a committed order");
            return Err(unavailable(vehicle_id, period));
        }

        Ok(guard)
    }

    /// Number of live holds across all vehicles.
    pub fn active_holds(&self) -> usize {
        lock_table(&self.table).holds.len()
    }
}

fn unavailable(vehicle_id: VehicleId, period: RentalPeriod) -> PipelineError {
    PipelineError::RangeUnavailable {
        vehicle_id,
        starts_at: period.starts_at(),
        ends_at: period.ends_at(),
    }
}

/// A live temporary hold. Released on drop, so every exit path of the
/// holder releases exactly once, panics included.
#[derive(Debug)]
pub struct RangeHold {
    table: Arc<Mutex<HoldTable>>,
    id: u64,
}

impl Drop for RangeHold {
    fn drop(&mut self) {
        lock_table(&self.table).holds.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use common::UserId;
    use domain::{Discount, Money, NewOrder};
    use order_store::InMemoryRentalStore;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, day, 12, 0, 0).unwrap()
    }

    fn period(from: u32, to: u32) -> RentalPeriod {
        RentalPeriod::new(ts(from), ts(to)).unwrap()
    }

    fn calendar() -> BookingCalendar {
        BookingCalendar::new(Arc::new(InMemoryRentalStore::new()))
    }

    #[tokio::test]
    async fn overlapping_hold_rejected_while_first_is_live() {
        let calendar = calendar();
        let vehicle = VehicleId::new();

        let _hold = calendar.hold(vehicle, period(1, 5), None).await.unwrap();
        let err = calendar.hold(vehicle, period(3, 8), None).await.unwrap_err();

        assert!(matches!(err, PipelineError::RangeUnavailable { .. }));
        assert_eq!(calendar.active_holds(), 1);
    }

    #[tokio::test]
    async fn hold_released_on_drop() {
        let calendar = calendar();
        let vehicle = VehicleId::new();

        {
            let _hold = calendar.hold(vehicle, period(1, 5), None).await.unwrap();
            assert_eq!(calendar.active_holds(), 1);
        }
        assert_eq!(calendar.active_holds(), 0);

        calendar.hold(vehicle, period(3, 8), None).await.unwrap();
    }

    #[tokio::test]
    async fn different_vehicles_do_not_conflict() {
        let calendar = calendar();

        let _a = calendar
            .hold(VehicleId::new(), period(1, 5), None)
            .await
            .unwrap();
        let _b = calendar
            .hold(VehicleId::new(), period(1, 5), None)
            .await
            .unwrap();

        assert_eq!(calendar.active_holds(), 2);
    }

    #[tokio::test]
    async fn touching_periods_can_both_be_held() {
        let calendar = calendar();
        let vehicle = VehicleId::new();

        let _a = calendar.hold(vehicle, period(1, 5), None).await.unwrap();
        let _b = calendar.hold(vehicle, period(5, 8), None).await.unwrap();
    }

    #[tokio::test]
    async fn excluded_order_does_not_block_its_own_range() {
        let store = Arc::new(InMemoryRentalStore::new());
        let calendar = BookingCalendar::new(store.clone());
        let vehicle = VehicleId::new();
        let order = store
            .insert_order(NewOrder {
                amount: Money::from_minor_units(500_000),
                discount: Discount::None,
                period: period(1, 5),
                pickup_location: "Main st. 1".to_string(),
                pickup_district: "CENTER".to_string(),
                return_location: String::new(),
                return_district: "PICKUP".to_string(),
                with_manager: false,
                vehicle_id: vehicle,
                user_id: UserId::new(),
            })
            .await
            .unwrap();

        let err = calendar.hold(vehicle, period(1, 5), None).await.unwrap_err();
        assert!(matches!(err, PipelineError::RangeUnavailable { .. }));
        assert_eq!(calendar.active_holds(), 0);

        let _hold = calendar
            .hold(vehicle, period(1, 5), Some(order.id))
            .await
            .unwrap();
    }
}
