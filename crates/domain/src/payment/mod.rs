//! Payment session model and payment strategy vocabulary.

mod session;

pub use session::{PayType, PaymentId, PaymentSession, PaymentStrategy, PayloadType};
