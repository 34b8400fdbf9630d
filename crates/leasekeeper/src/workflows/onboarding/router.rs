use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::invitation::OnboardingService;
use crate::domain::{InvitationId, NewInvitation, NewTenant};
use crate::session::SessionKeys;
use crate::store::OnboardingStore;
use crate::workflows::WorkflowError;

pub struct OnboardingRoutes<S> {
    service: Arc<OnboardingService<S>>,
    sessions: Arc<SessionKeys>,
}

impl<S> OnboardingRoutes<S> {
    pub(crate) fn new(service: Arc<OnboardingService<S>>, sessions: Arc<SessionKeys>) -> Self {
        Self { service, sessions }
    }
}

impl<S> Clone for OnboardingRoutes<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenQuery {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenBody {
    token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignupBody {
    token: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignInBody {
    email: String,
    password: String,
}

/// Router builder for landlord-side admission and the invitee's public token endpoints.
pub fn onboarding_router<S>(
    service: Arc<OnboardingService<S>>,
    sessions: Arc<SessionKeys>,
) -> Router
where
    S: OnboardingStore + 'static,
{
    Router::new()
        .route("/api/v1/tenants", post(admit_handler::<S>))
        .route("/api/v1/invitations", post(create_invitation_handler::<S>))
        .route(
            "/api/v1/invitations/:invitation_id/convert",
            post(convert_handler::<S>),
        )
        .route(
            "/api/v1/invitation-tokens/lookup",
            get(lookup_handler::<S>),
        )
        .route(
            "/api/v1/invitation-tokens/verify",
            post(verify_token_handler::<S>),
        )
        .route(
            "/api/v1/invitation-tokens/redeem",
            post(redeem_handler::<S>),
        )
        .route(
            "/api/v1/signup",
            get(preview_handler::<S>).post(signup_handler::<S>),
        )
        .route("/api/v1/auth/sign-in", post(sign_in_handler::<S>))
        .with_state(OnboardingRoutes::new(service, sessions))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, WorkflowError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        WorkflowError::Validation(format!("invalid request body: {}", rejection.body_text()))
    })
}

pub(crate) async fn admit_handler<S: OnboardingStore + 'static>(
    State(routes): State<OnboardingRoutes<S>>,
    headers: HeaderMap,
    payload: Result<Json<NewTenant>, JsonRejection>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    let admitted = routes.service.admit_tenant(actor, body(payload)?)?;
    Ok((StatusCode::CREATED, Json(admitted)))
}

async fn create_invitation_handler<S: OnboardingStore + 'static>(
    State(routes): State<OnboardingRoutes<S>>,
    headers: HeaderMap,
    payload: Result<Json<NewInvitation>, JsonRejection>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    let invitation = routes.service.create_invitation(actor, body(payload)?)?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

async fn convert_handler<S: OnboardingStore + 'static>(
    State(routes): State<OnboardingRoutes<S>>,
    headers: HeaderMap,
    Path(invitation_id): Path<InvitationId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let actor = routes.sessions.authenticate(&headers)?;
    let admitted = routes.service.convert_to_tenant(actor, invitation_id)?;
    Ok((StatusCode::CREATED, Json(admitted)))
}

async fn lookup_handler<S: OnboardingStore + 'static>(
    State(routes): State<OnboardingRoutes<S>>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, WorkflowError> {
    let token = query.token.unwrap_or_default();
    let invitation = routes.service.invitation_by_token(&token)?;
    Ok(Json(json!({
        "invitation_id": invitation.id,
        "property_id": invitation.property_id,
        "unit_id": invitation.unit_id,
        "first_name": invitation.contact.first_name,
        "expires_at": invitation.expires_at,
    })))
}

async fn verify_token_handler<S: OnboardingStore + 'static>(
    State(routes): State<OnboardingRoutes<S>>,
    payload: Result<Json<TokenBody>, JsonRejection>,
) -> Result<impl IntoResponse, WorkflowError> {
    let TokenBody { token } = body(payload)?;
    let invitation = routes.service.mark_verified(&token)?;
    Ok(Json(json!({
        "success": true,
        "invitation_id": invitation.id,
        "verified_at": invitation.verified_at,
    })))
}

pub(crate) async fn redeem_handler<S: OnboardingStore + 'static>(
    State(routes): State<OnboardingRoutes<S>>,
    payload: Result<Json<TokenBody>, JsonRejection>,
) -> Result<impl IntoResponse, WorkflowError> {
    let TokenBody { token } = body(payload)?;
    let admitted = routes.service.redeem_invitation(&token)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "tenant": admitted.tenant })),
    ))
}

async fn preview_handler<S: OnboardingStore + 'static>(
    State(routes): State<OnboardingRoutes<S>>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, WorkflowError> {
    let token = query.token.unwrap_or_default();
    Ok(Json(routes.service.verify_invitation(&token)?))
}

pub(crate) async fn signup_handler<S: OnboardingStore + 'static>(
    State(routes): State<OnboardingRoutes<S>>,
    payload: Result<Json<SignupBody>, JsonRejection>,
) -> Result<impl IntoResponse, WorkflowError> {
    let SignupBody { token, password } = body(payload)?;
    let outcome = routes.service.complete_signup(&token, &password)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn sign_in_handler<S: OnboardingStore + 'static>(
    State(routes): State<OnboardingRoutes<S>>,
    payload: Result<Json<SignInBody>, JsonRejection>,
) -> Result<impl IntoResponse, WorkflowError> {
    let SignInBody { email, password } = body(payload)?;
    let session_token = routes.service.sign_in(&email, &password)?;
    Ok(Json(json!({ "session_token": session_token })))
}
