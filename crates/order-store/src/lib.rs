//! Storage layer for rental orders and payment sessions.
//!
//! Exposes the [`RentalStore`] trait — the persisted-fields contract the
//! pipeline runs against — together with an in-memory implementation for
//! tests and the demo server, and a PostgreSQL implementation for real
//! deployments.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryRentalStore;
pub use postgres::PostgresRentalStore;
pub use store::RentalStore;
