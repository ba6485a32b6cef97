//! Payment sessions and their expiry rules.

use chrono::{DateTime, Duration, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

/// Gateway-issued payment identifier. Globally unique on the provider
/// side and used as the session's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    /// Wraps a gateway-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PaymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PaymentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How the client pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStrategy {
    /// Card payment: two-stage, the amount is reserved first and
    /// confirmed (captured) later by the pipeline.
    Card,

    /// Faster-payments (QR) transfer: single-stage, funds move immediately.
    Sbp,
}

impl PaymentStrategy {
    /// Returns the gateway staging mode for this strategy.
    pub fn pay_type(&self) -> PayType {
        match self {
            PaymentStrategy::Card => PayType::TwoStage,
            PaymentStrategy::Sbp => PayType::SingleStage,
        }
    }
}

/// One-stage vs two-stage payment as the gateway understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayType {
    SingleStage,
    TwoStage,
}

/// What the `payload` field of an initialized session contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadType {
    /// URL of the hosted payment form.
    PaymentUrl,

    /// URL of a QR code image.
    QrUrl,

    /// Inline QR code image (SVG).
    QrImage,
}

/// The provider-side record of an initiated payment.
///
/// One session belongs to exactly one order. A session is only ever
/// deleted as part of reinitialization, where the delete and the insert
/// of the replacement are a single atomic unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub strategy: PaymentStrategy,
    pub payload_type: PayloadType,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    /// How long the client has to pay, counted from `created_at`.
    #[serde(with = "lifetime_seconds")]
    pub lifetime: Duration,
}

impl PaymentSession {
    /// The instant the session stops being payable.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + self.lifetime
    }

    /// Returns true once `now` has reached the expiry instant.
    ///
    /// The boundary is inclusive: a session with a 7200s lifetime is
    /// expired at exactly `created_at + 7200s`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Serializes the session lifetime as whole seconds.
mod lifetime_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        value.num_seconds().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(seconds))
    }
}
