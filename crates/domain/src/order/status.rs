//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of a rental order in its lifecycle.
///
/// Transitions (terminal states marked `T`):
/// ```text
/// New ──► AwaitPayment | AwaitReservation ──► ReservationSuccess | PaymentSuccess
///     ──► WithoutDocs | OnApproval ──► ApprovalSuccess | VerifyFailed
///     ──► AwaitConfirmPayment ──► Booked | ConfirmPaymentFailed
///     ──► Active ──► Completed(T)
///
/// any pre-Active ──► Canceled(T) | Rejected(T)
/// Rejected | ReinitFailed | PaymentSessionExpired ──► OnReinit ──► ReinitFailed
/// ```
///
/// Which statuses a given pipeline step may fire from is declared by the
/// step itself; this enum only captures the vocabulary and the global
/// properties (terminality, whether the order still claims its rental
/// period).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order row persisted, payment session not yet initialized.
    #[default]
    New,

    /// Single-stage payment session initialized, waiting for the client to pay.
    AwaitPayment,

    /// Two-stage (card) session initialized, waiting for the amount to be reserved.
    AwaitReservation,

    /// The card amount was reserved by the bank.
    ReservationSuccess,

    /// The single-stage payment went through.
    PaymentSuccess,

    /// Order was placed through a manager and carries no client documents yet.
    WithoutDocs,

    /// Document verification is in progress.
    OnApproval,

    /// Documents passed verification.
    ApprovalSuccess,

    /// Document verification failed.
    VerifyFailed,

    /// Waiting for the gateway to confirm (capture) the reserved amount.
    AwaitConfirmPayment,

    /// The gateway confirm call failed.
    ConfirmPaymentFailed,

    /// Order confirmed; the rental period is firmly reserved.
    Booked,

    /// The rental period has started.
    Active,

    /// The rental finished normally (terminal).
    Completed,

    /// The order was canceled (terminal).
    Canceled,

    /// The payment was rejected by the bank (terminal).
    Rejected,

    /// A payment session reinitialization is in flight.
    OnReinit,

    /// Payment session reinitialization failed.
    ReinitFailed,

    /// The payment session expired before the client paid.
    PaymentSessionExpired,
}

impl OrderStatus {
    /// Returns true for statuses with no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Canceled | OrderStatus::Rejected
        )
    }

    /// Returns true while the order still counts as occupying its rental
    /// period for overlap checks.
    ///
    /// Orders that were canceled, rejected by the bank, failed
    /// reinitialization, or whose payment session expired release their
    /// dates back to the calendar. `OnReinit` deliberately re-claims the
    /// period so nobody can grab the dates mid-reinitialization.
    pub fn holds_rental_period(&self) -> bool {
        !matches!(
            self,
            OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::ReinitFailed
                | OrderStatus::PaymentSessionExpired
        )
    }

    /// Returns the status name in its storage encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::AwaitPayment => "AWAIT_PAYMENT",
            OrderStatus::AwaitReservation => "AWAIT_RESERVATION",
            OrderStatus::ReservationSuccess => "RESERVATION_SUCCESS",
            OrderStatus::PaymentSuccess => "PAYMENT_SUCCESS",
            OrderStatus::WithoutDocs => "WITHOUT_DOCS",
            OrderStatus::OnApproval => "ON_APPROVAL",
            OrderStatus::ApprovalSuccess => "APPROVAL_SUCCESS",
            OrderStatus::VerifyFailed => "VERIFY_FAILED",
            OrderStatus::AwaitConfirmPayment => "AWAIT_CONFIRM_PAYMENT",
            OrderStatus::ConfirmPaymentFailed => "CONFIRM_PAYMENT_FAILED",
            OrderStatus::Booked => "BOOKED",
            OrderStatus::Active => "ACTIVE",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::OnReinit => "ON_REINIT",
            OrderStatus::ReinitFailed => "REINIT_FAILED",
            OrderStatus::PaymentSessionExpired => "PAYMENT_SESSION_EXPIRED",
        }
    }

    /// Parses a status from its storage encoding.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "NEW" => OrderStatus::New,
            "AWAIT_PAYMENT" => OrderStatus::AwaitPayment,
            "AWAIT_RESERVATION" => OrderStatus::AwaitReservation,
            "RESERVATION_SUCCESS" => OrderStatus::ReservationSuccess,
            "PAYMENT_SUCCESS" => OrderStatus::PaymentSuccess,
            "WITHOUT_DOCS" => OrderStatus::WithoutDocs,
            "ON_APPROVAL" => OrderStatus::OnApproval,
            "APPROVAL_SUCCESS" => OrderStatus::ApprovalSuccess,
            "VERIFY_FAILED" => OrderStatus::VerifyFailed,
            "AWAIT_CONFIRM_PAYMENT" => OrderStatus::AwaitConfirmPayment,
            "CONFIRM_PAYMENT_FAILED" => OrderStatus::ConfirmPaymentFailed,
            "BOOKED" => OrderStatus::Booked,
            "ACTIVE" => OrderStatus::Active,
            "COMPLETED" => OrderStatus::Completed,
            "CANCELED" => OrderStatus::Canceled,
            "REJECTED" => OrderStatus::Rejected,
            "ON_REINIT" => OrderStatus::OnReinit,
            "REINIT_FAILED" => OrderStatus::ReinitFailed,
            "PAYMENT_SESSION_EXPIRED" => OrderStatus::PaymentSessionExpired,
            _ => return None,
        })
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_new() {
        assert_eq!(OrderStatus::default(), OrderStatus::New);
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());

        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::Booked.is_terminal());
        assert!(!OrderStatus::ReinitFailed.is_terminal());
        assert!(!OrderStatus::PaymentSessionExpired.is_terminal());
    }

    #[test]
    fn released_statuses_do_not_hold_the_period() {
        assert!(!OrderStatus::Canceled.holds_rental_period());
        assert!(!OrderStatus::Rejected.holds_rental_period());
        assert!(!OrderStatus::ReinitFailed.holds_rental_period());
        assert!(!OrderStatus::PaymentSessionExpired.holds_rental_period());
    }

    #[test]
    fn live_statuses_hold_the_period() {
        assert!(OrderStatus::New.holds_rental_period());
        assert!(OrderStatus::AwaitPayment.holds_rental_period());
        assert!(OrderStatus::Booked.holds_rental_period());
        assert!(OrderStatus::Active.holds_rental_period());
        assert!(OrderStatus::OnReinit.holds_rental_period());
        assert!(OrderStatus::Completed.holds_rental_period());
    }

    #[test]
    fn serde_uses_storage_encoding() {
        let json = serde_json::to_string(&OrderStatus::AwaitConfirmPayment).unwrap();
        assert_eq!(json, "\"AWAIT_CONFIRM_PAYMENT\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStatus::AwaitConfirmPayment);
    }

    #[test]
    fn parse_roundtrips_every_status() {
        for status in [
            OrderStatus::New,
            OrderStatus::AwaitPayment,
            OrderStatus::AwaitReservation,
            OrderStatus::ReservationSuccess,
            OrderStatus::PaymentSuccess,
            OrderStatus::WithoutDocs,
            OrderStatus::OnApproval,
            OrderStatus::ApprovalSuccess,
            OrderStatus::VerifyFailed,
            OrderStatus::AwaitConfirmPayment,
            OrderStatus::ConfirmPaymentFailed,
            OrderStatus::Booked,
            OrderStatus::Active,
            OrderStatus::Completed,
            OrderStatus::Canceled,
            OrderStatus::Rejected,
            OrderStatus::OnReinit,
            OrderStatus::ReinitFailed,
            OrderStatus::PaymentSessionExpired,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("NOT_A_STATUS"), None);
    }
}
