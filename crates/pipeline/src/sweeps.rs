//! Periodic bulk transitions driven by the clock.

use chrono::{DateTime, Utc};
use order_store::RentalStore;
use tracing::info;

use crate::Result;

/// Moves `Booked` orders whose rental has started into `Active`.
#[tracing::instrument(skip(store))]
pub async fn activate_started_orders(store: &dyn RentalStore, now: DateTime<Utc>) -> Result<u64> {
    let activated = store.activate_due_orders(now).await?;
    if activated > 0 {
        info!(activated, "activated due orders");
    }
    metrics::counter!("orders_activated_total").increment(activated);
    Ok(activated)
}

/// Expires orders still awaiting payment whose session ran out.
#[tracing::instrument(skip(store))]
pub async fn expire_payment_sessions(store: &dyn RentalStore, now: DateTime<Utc>) -> Result<u64> {
    let expired = store.expire_stale_sessions(now).await?;
    if expired > 0 {
        info!(expired, "expired stale payment sessions");
    }
    metrics::counter!("payment_sessions_expired_total").increment(expired);
    Ok(expired)
}
