//! Order model: status machine, row type, rental periods and money.

mod model;
mod period;
mod status;
mod value_objects;

pub use model::{NewOrder, Order};
pub use period::RentalPeriod;
pub use status::OrderStatus;
pub use value_objects::{Discount, Money};
