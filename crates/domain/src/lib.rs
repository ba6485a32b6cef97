//! Domain model for the rental order lifecycle.
//!
//! This crate holds the pure data types the rest of the system is built
//! around: the order status state machine, the order row model, validated
//! rental periods, and payment sessions with their expiry rules. There is
//! no I/O here; persistence and orchestration live in other crates.

pub mod error;
pub mod order;
pub mod payment;

pub use error::DomainError;
pub use order::{Discount, Money, NewOrder, Order, OrderStatus, RentalPeriod};
pub use payment::{PayType, PaymentId, PaymentSession, PaymentStrategy, PayloadType};
