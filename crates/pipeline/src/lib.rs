//! Order lifecycle pipeline.
//!
//! The pipeline drives an order through its status graph as a chain of
//! guarded steps. Each step re-checks the order's current status at write
//! time through the store, so at-least-once delivery of the same work item
//! cannot double-apply a transition. Around the chain sit the booking
//! calendar (temporary range holds), the payment session manager, the
//! creation facade, gateway callback handling, notification dispatch and
//! the background sweeps.

mod builder;
mod calendar;
mod context;
mod error;
mod facade;
mod gateway;
mod gateway_notices;
mod notifications;
mod scheduler;
mod sessions;
mod step;
mod verification;

pub mod steps;
pub mod sweeps;

pub use builder::{ChainBuilder, Stage};
pub use calendar::{BookingCalendar, RangeHold};
pub use context::{OrderContext, StepOutcome};
pub use error::{PipelineError, Result};
pub use facade::{CreateOrderRequest, OrderCreationService};
pub use gateway::{
    GatewayError, InMemoryPaymentGateway, PaymentGateway, PaymentInitRequest, PaymentInitResponse,
};
pub use gateway_notices::{GatewayNotice, GatewayNoticeHandler, GatewayNoticeStatus};
pub use notifications::{
    NoticeKind, NotificationDispatcher, NotificationPort, NotifyError, RecordingNotifier,
    TracingNotifier,
};
pub use scheduler::{ChannelScheduler, PipelineScheduler, PipelineWorker};
pub use sessions::{PaymentConfig, PaymentSessionManager};
pub use step::{ChainOutcome, PipelineChain, PipelineStep};
pub use verification::{
    DocumentVerification, InMemoryVerifier, VerificationError, Verdict,
};
