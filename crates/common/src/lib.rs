//! Shared identifier types used across the rental order crates.

mod types;

pub use types::{OrderId, UserId, VehicleId};
