//! Execution context and step results.

use common::OrderId;

/// What a pipeline step receives.
///
/// Deliberately carries identity only. Steps reload the current row from
/// the store, so a context that sat in a queue never carries stale state.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext {
    pub order_id: OrderId,
}

impl OrderContext {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

/// What a successfully executed step tells the chain to do next.
///
/// `Halted` is a logically successful stop (e.g. an order parked waiting
/// for documents), distinct from `Err`: the step did its work, the rest
/// of the chain just does not apply yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Proceed to the next step in the chain.
    Continue,

    /// Stop the chain without error.
    Halted { reason: &'static str },
}
