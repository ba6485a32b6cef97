pub mod health;
pub mod hooks;
pub mod metrics;
pub mod orders;
