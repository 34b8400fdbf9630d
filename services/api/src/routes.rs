use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use leasekeeper::workflows::dispatch::dispatch_router;
use leasekeeper::workflows::occupancy::occupancy_router;
use leasekeeper::workflows::onboarding::onboarding_router;
use serde_json::json;
use std::sync::Arc;

/// All workflow routers plus the operational endpoints.
pub(crate) fn with_workflow_routes(services: &Services) -> axum::Router {
    occupancy_router(
        Arc::clone(&services.occupancy),
        Arc::clone(&services.sessions),
    )
    .merge(dispatch_router(
        Arc::clone(&services.dispatcher),
        Arc::clone(&services.sessions),
    ))
    .merge(onboarding_router(
        Arc::clone(&services.onboarding),
        Arc::clone(&services.sessions),
    ))
    .route("/health", axum::routing::get(healthcheck))
    .route("/ready", axum::routing::get(readiness_endpoint))
    .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
