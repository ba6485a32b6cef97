//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Order, PaymentSession};
use order_store::RentalStore;
use pipeline::steps::{CancelOrderStep, CompleteOrderStep, ReinitPaymentSessionStep};
use pipeline::{
    ChannelScheduler, CreateOrderRequest, GatewayNoticeHandler, OrderContext,
    OrderCreationService, PipelineScheduler, PipelineStep, Stage,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub store: Arc<dyn RentalStore>,
    pub creation: Arc<OrderCreationService>,
    pub scheduler: ChannelScheduler,
    pub cancel: Arc<CancelOrderStep>,
    pub complete: Arc<CompleteOrderStep>,
    pub reinit: Arc<ReinitPaymentSessionStep>,
    pub notices: Arc<GatewayNoticeHandler>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct ProcessRequest {
    #[serde(default = "default_stage")]
    pub stage: Stage,
}

fn default_stage() -> Stage {
    Stage::CheckDocuments
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    pub amount_minor_units: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub vehicle_id: String,
    pub user_id: String,
    pub with_manager: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentResponse>,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub payment_id: String,
    pub payload_type: String,
    pub payload: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ProcessAccepted {
    pub order_id: String,
    pub stage: Stage,
}

fn order_response(order: Order, session: Option<PaymentSession>) -> OrderResponse {
    OrderResponse {
        id: order.id.to_string(),
        status: order.status.to_string(),
        amount_minor_units: order.amount.minor_units(),
        starts_at: order.starts_at,
        ends_at: order.ends_at,
        vehicle_id: order.vehicle_id.to_string(),
        user_id: order.user_id.to_string(),
        with_manager: order.with_manager,
        payment: session.map(|s| PaymentResponse {
            payment_id: s.payment_id.to_string(),
            payload_type: format!("{:?}", s.payload_type),
            payload: s.payload.clone(),
            expires_at: s.expires_at(),
        }),
    }
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

// -- Handlers --

/// POST /orders — create an order and open its payment session.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let (order, session) = state.creation.create(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(order_response(order, Some(session))),
    ))
}

/// GET /orders/:id — load an order with its payment session.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .store
        .order(order_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;
    let session = state
        .store
        .payment_session(order_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(order_response(order, session)))
}

/// POST /orders/:id/process — hand the order to the pipeline worker.
#[tracing::instrument(skip(state, req))]
pub async fn process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ProcessRequest>,
) -> Result<(StatusCode, Json<ProcessAccepted>), ApiError> {
    let order_id = parse_order_id(&id)?;

    // Fail fast on unknown orders; the guard inside the first step owns
    // the status check.
    state
        .store
        .order(order_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;

    state.scheduler.enqueue(order_id, req.stage).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessAccepted {
            order_id: order_id.to_string(),
            stage: req.stage,
        }),
    ))
}

/// POST /orders/:id/cancel — cancel the order and void its payment.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    run_step(&state, state.cancel.as_ref(), &id).await
}

/// POST /orders/:id/complete — close out a finished rental.
#[tracing::instrument(skip(state))]
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    run_step(&state, state.complete.as_ref(), &id).await
}

/// POST /orders/:id/reinit — open a fresh payment session for a dead order.
#[tracing::instrument(skip(state))]
pub async fn reinit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    run_step(&state, state.reinit.as_ref(), &id).await
}

async fn run_step(
    state: &AppState,
    step: &dyn PipelineStep,
    id: &str,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(id)?;
    step.execute(&OrderContext::new(order_id)).await?;

    let order = state
        .store
        .order(order_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;
    let session = state
        .store
        .payment_session(order_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(order_response(order, session)))
}
