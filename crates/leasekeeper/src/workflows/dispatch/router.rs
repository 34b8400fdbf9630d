use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::service::{MaintenanceDispatcher, MaintenanceRequestInput};
use crate::domain::MaintenanceRequestId;
use crate::session::SessionKeys;
use crate::store::DispatchStore;
use crate::workflows::WorkflowError;

pub struct DispatchRoutes<S> {
    dispatcher: Arc<MaintenanceDispatcher<S>>,
    sessions: Arc<SessionKeys>,
}

impl<S> DispatchRoutes<S> {
    pub(crate) fn new(dispatcher: Arc<MaintenanceDispatcher<S>>, sessions: Arc<SessionKeys>) -> Self {
        Self {
            dispatcher,
            sessions,
        }
    }
}

impl<S> Clone for DispatchRoutes<S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmQuery {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmBody {
    token: String,
}

/// Router builder exposing maintenance intake and the vendor confirmation link.
pub fn dispatch_router<S>(
    dispatcher: Arc<MaintenanceDispatcher<S>>,
    sessions: Arc<SessionKeys>,
) -> Router
where
    S: DispatchStore + 'static,
{
    Router::new()
        .route("/api/v1/maintenance", post(create_handler::<S>))
        .route(
            "/api/v1/maintenance/confirm",
            get(preview_handler::<S>).post(confirm_handler::<S>),
        )
        .route(
            "/api/v1/maintenance/requests/:request_id",
            get(show_handler::<S>),
        )
        .with_state(DispatchRoutes::new(dispatcher, sessions))
}

pub(crate) async fn create_handler<S: DispatchStore + 'static>(
    State(routes): State<DispatchRoutes<S>>,
    headers: HeaderMap,
    payload: Result<Json<MaintenanceRequestInput>, JsonRejection>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    let Json(input) = payload.map_err(|rejection| {
        WorkflowError::Validation(format!("invalid request body: {}", rejection.body_text()))
    })?;

    let maintenance = routes.dispatcher.create_request(actor, input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "maintenance": maintenance })),
    ))
}

/// The vendor follows this link from email, so it carries no session. Viewing the request
/// never confirms it; mail scanners prefetch links.
pub(crate) async fn preview_handler<S: DispatchStore + 'static>(
    State(routes): State<DispatchRoutes<S>>,
    Query(query): Query<ConfirmQuery>,
) -> Result<impl IntoResponse, WorkflowError> {
    let token = query.token.unwrap_or_default();
    let maintenance = routes.dispatcher.pending_confirmation(&token)?;
    Ok(Json(json!({ "success": true, "maintenance": maintenance })))
}

pub(crate) async fn confirm_handler<S: DispatchStore + 'static>(
    State(routes): State<DispatchRoutes<S>>,
    payload: Result<Json<ConfirmBody>, JsonRejection>,
) -> Result<impl IntoResponse, WorkflowError> {
    let Json(body) = payload.map_err(|rejection| {
        WorkflowError::Validation(format!("invalid request body: {}", rejection.body_text()))
    })?;
    let maintenance = routes.dispatcher.confirm(&body.token)?;
    Ok(Json(json!({ "success": true, "maintenance": maintenance })))
}

async fn show_handler<S: DispatchStore + 'static>(
    State(routes): State<DispatchRoutes<S>>,
    headers: HeaderMap,
    Path(request_id): Path<MaintenanceRequestId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    Ok(Json(routes.dispatcher.request(actor, request_id)?))
}
