//! Payment gateway callback endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use pipeline::GatewayNotice;

use crate::error::ApiError;
use crate::routes::orders::AppState;

/// POST /hooks/payment — apply a payment status callback.
///
/// The gateway retries delivery until it receives a 2xx with an `OK`
/// body, so anything the handler swallows (a stale notice) still
/// acknowledges.
#[tracing::instrument(skip(state, notice))]
pub async fn payment(
    State(state): State<Arc<AppState>>,
    Json(notice): Json<GatewayNotice>,
) -> Result<&'static str, ApiError> {
    state.notices.handle(notice).await?;
    Ok("OK")
}
