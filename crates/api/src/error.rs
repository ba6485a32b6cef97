//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_store::StoreError;
use pipeline::PipelineError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Pipeline or domain failure.
    Pipeline(PipelineError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Pipeline(err) => pipeline_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn pipeline_error_to_response(err: PipelineError) -> (StatusCode, String) {
    let status = match &err {
        PipelineError::InvalidState { .. } | PipelineError::RangeUnavailable { .. } => {
            StatusCode::CONFLICT
        }
        PipelineError::Gateway(_) => StatusCode::BAD_GATEWAY,
        PipelineError::VerificationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::OrderNotFound(_) | PipelineError::Store(StoreError::SessionNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        PipelineError::Domain(_) => StatusCode::BAD_REQUEST,
        PipelineError::MissingResult { .. } | PipelineError::Store(_) => {
            tracing::error!(error = %err, "pipeline internal error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::OrderStatus;

    fn status_of(err: PipelineError) -> StatusCode {
        pipeline_error_to_response(err).0
    }

    #[test]
    fn conflict_for_guard_and_range() {
        assert_eq!(
            status_of(PipelineError::InvalidState {
                order_id: OrderId::new(),
                current: OrderStatus::Booked,
                allowed: vec![OrderStatus::Active],
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn not_found_and_unprocessable() {
        assert_eq!(
            status_of(PipelineError::OrderNotFound(OrderId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(PipelineError::Store(StoreError::SessionNotFound(
                OrderId::new()
            ))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(PipelineError::VerificationFailed {
                order_id: OrderId::new(),
                reason: "license expired".to_string(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
