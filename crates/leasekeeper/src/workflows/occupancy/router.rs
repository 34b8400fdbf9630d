use std::io::Cursor;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use super::service::OccupancyManager;
use crate::domain::{NewProperty, NewUnit, PropertyId, TenantId, TenantPatch, UnitId, UnitPatch};
use crate::session::SessionKeys;
use crate::store::OccupancyStore;
use crate::workflows::WorkflowError;

pub struct OccupancyRoutes<S> {
    manager: Arc<OccupancyManager<S>>,
    sessions: Arc<SessionKeys>,
}

impl<S> OccupancyRoutes<S> {
    pub(crate) fn new(manager: Arc<OccupancyManager<S>>, sessions: Arc<SessionKeys>) -> Self {
        Self { manager, sessions }
    }
}

impl<S> Clone for OccupancyRoutes<S> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

/// Router builder exposing property, unit, and tenant maintenance endpoints.
pub fn occupancy_router<S>(manager: Arc<OccupancyManager<S>>, sessions: Arc<SessionKeys>) -> Router
where
    S: OccupancyStore + 'static,
{
    Router::new()
        .route("/api/v1/properties", post(create_property::<S>))
        .route("/api/v1/properties/:property_id", get(get_property::<S>))
        .route(
            "/api/v1/properties/:property_id/units",
            get(list_units::<S>),
        )
        .route(
            "/api/v1/properties/:property_id/units/import",
            post(import_units::<S>),
        )
        .route(
            "/api/v1/properties/:property_id/assignment-options",
            get(assignment_options::<S>),
        )
        .route("/api/v1/units", post(create_unit::<S>))
        .route(
            "/api/v1/units/:unit_id",
            get(get_unit::<S>)
                .patch(update_unit::<S>)
                .delete(delete_unit::<S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id",
            patch(update_tenant::<S>)
                .get(get_tenant::<S>)
                .delete(delete_tenant::<S>),
        )
        .route("/api/v1/occupancy/resync", post(resync::<S>))
        .with_state(OccupancyRoutes::new(manager, sessions))
}

pub(crate) async fn create_property<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Json(input): Json<NewProperty>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    let property = routes.manager.create_property(actor, input)?;
    Ok((StatusCode::CREATED, Json(property)))
}

async fn get_property<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Path(property_id): Path<PropertyId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    Ok(Json(routes.manager.property(actor, property_id)?))
}

async fn list_units<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Path(property_id): Path<PropertyId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    Ok(Json(routes.manager.units(actor, property_id)?))
}

async fn import_units<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Path(property_id): Path<PropertyId>,
    body: String,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    let summary = routes
        .manager
        .import_units(actor, property_id, Cursor::new(body.into_bytes()))?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn assignment_options<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Path(property_id): Path<PropertyId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    Ok(Json(routes.manager.assignment_options(actor, property_id)?))
}

pub(crate) async fn create_unit<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Json(input): Json<NewUnit>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    let unit = routes.manager.create_unit(actor, input)?;
    Ok((StatusCode::CREATED, Json(unit)))
}

async fn get_unit<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Path(unit_id): Path<UnitId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    Ok(Json(routes.manager.unit(actor, unit_id)?))
}

async fn update_unit<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Path(unit_id): Path<UnitId>,
    Json(patch): Json<UnitPatch>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    Ok(Json(routes.manager.update_unit(actor, unit_id, patch)?))
}

pub(crate) async fn delete_unit<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Path(unit_id): Path<UnitId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    routes.manager.delete_unit(actor, unit_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_tenant<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Path(tenant_id): Path<TenantId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    Ok(Json(routes.manager.tenant(actor, tenant_id)?))
}

async fn update_tenant<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Path(tenant_id): Path<TenantId>,
    Json(patch): Json<TenantPatch>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    Ok(Json(routes.manager.update_tenant(actor, tenant_id, patch)?))
}

async fn delete_tenant<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
    Path(tenant_id): Path<TenantId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    routes.manager.delete_tenant(actor, tenant_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resync<S: OccupancyStore + 'static>(
    State(routes): State<OccupancyRoutes<S>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    Ok(Json(routes.manager.resync_owned(actor)?))
}
