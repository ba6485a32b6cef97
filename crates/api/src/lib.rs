//! HTTP surface of the rental order system.
//!
//! REST endpoints for creating and driving orders through the lifecycle
//! pipeline, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryRentalStore, RentalStore};
use pipeline::steps::{
    CancelOrderStep, CheckDocumentsStep, CompleteOrderStep, ConfirmOrderStep,
    ReinitPaymentSessionStep, VerifyDocumentsStep,
};
use pipeline::{
    BookingCalendar, ChainBuilder, GatewayNoticeHandler, InMemoryPaymentGateway, InMemoryVerifier,
    NotificationDispatcher, OrderCreationService, PaymentConfig, PaymentSessionManager,
    PipelineWorker, TracingNotifier,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/process", post(routes::orders::process))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/orders/{id}/complete", post(routes::orders::complete))
        .route("/orders/{id}/reinit", post(routes::orders::reinit))
        .route("/hooks/payment", post(routes::hooks::payment))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the full pipeline over the given store and payment settings.
///
/// Returns the shared state and the (not yet running) pipeline worker;
/// the caller decides where to spawn the worker.
pub fn create_state(
    store: Arc<dyn RentalStore>,
    payment: PaymentConfig,
) -> (Arc<AppState>, PipelineWorker) {
    let gateway = Arc::new(InMemoryPaymentGateway::new());
    let verifier = Arc::new(InMemoryVerifier::new());
    let notifier = Arc::new(NotificationDispatcher::new(Arc::new(TracingNotifier)));

    let sessions = Arc::new(PaymentSessionManager::new(gateway.clone(), payment));
    let calendar = Arc::new(BookingCalendar::new(Arc::clone(&store)));

    let builder = Arc::new(ChainBuilder::new(
        Arc::new(CheckDocumentsStep::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
        )),
        Arc::new(VerifyDocumentsStep::new(
            Arc::clone(&store),
            verifier,
            Arc::clone(&notifier),
        )),
        Arc::new(ConfirmOrderStep::new(
            Arc::clone(&store),
            gateway.clone(),
            Arc::clone(&notifier),
        )),
    ));
    let (scheduler, worker) = PipelineWorker::new(builder);
    let notices = Arc::new(GatewayNoticeHandler::new(
        Arc::clone(&store),
        Arc::new(scheduler.clone()),
    ));

    let state = Arc::new(AppState {
        creation: Arc::new(OrderCreationService::new(
            Arc::clone(&store),
            Arc::clone(&calendar),
            Arc::clone(&sessions),
        )),
        scheduler,
        cancel: Arc::new(CancelOrderStep::new(
            Arc::clone(&store),
            gateway.clone(),
            Arc::clone(&notifier),
        )),
        complete: Arc::new(CompleteOrderStep::new(Arc::clone(&store))),
        reinit: Arc::new(ReinitPaymentSessionStep::new(
            Arc::clone(&store),
            sessions,
            calendar,
        )),
        notices,
        store,
    });

    (state, worker)
}

/// Demo wiring: everything in memory.
pub fn create_default_state(config: &Config) -> (Arc<AppState>, PipelineWorker) {
    let store: Arc<dyn RentalStore> = Arc::new(InMemoryRentalStore::new());
    create_state(store, config.payment())
}
