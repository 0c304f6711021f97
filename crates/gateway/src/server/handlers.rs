//! Axum request handlers for all service endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, GatewayRequest, HealthResponse};
use common::ServiceError;
use tracing::warn;
use uuid::Uuid;

use super::state::AppState;

/// `POST /v1/gateway`: partition, protect and forward one request.
///
/// Only the prompt and requested model reach the provider. The response
/// carries the generated content and a provenance record.
pub async fn gateway(
    State(state): State<AppState>,
    payload: Result<Json<GatewayRequest>, JsonRejection>,
) -> Response {
    // Rejection text can echo body fragments; only the status is logged.
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!(status = %rejection.status(), "rejected undecodable gateway request");
            return error_response(ServiceError::BadRequest("invalid request body".into()));
        }
    };

    let request_id = Uuid::new_v4();
    match state.gateway.handle(request_id, &req).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// `GET /health`: liveness check reporting the key-wrapping backend.
pub async fn health(State(state): State<AppState>) -> Response {
    let body = HealthResponse {
        status: "ok".into(),
        key_backend: state.key_backend.as_str().into(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match &err {
        ServiceError::BadRequest(m)
        | ServiceError::ProtectionFailure(m)
        | ServiceError::IntegrityFailure(m)
        | ServiceError::BadGateway(m) => m.clone(),
    };
    (status, Json(ErrorResponse::new(err.code(), message))).into_response()
}
