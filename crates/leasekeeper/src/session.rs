//! Session tokens: HS256 JWTs that carry the caller identity into each workflow call.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::{AccountId, AccountRole, Actor, LandlordId, TenantId};
use crate::workflows::WorkflowError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: AccountId,
    pub role: AccountRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landlord_id: Option<LandlordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn actor(&self) -> Option<Actor> {
        match self.role {
            AccountRole::Landlord => self.landlord_id.map(Actor::Landlord),
            AccountRole::Tenant => self.tenant_id.map(Actor::Tenant),
        }
    }
}

/// Signs and verifies session tokens. Without a secret every operation fails.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    secret: Option<String>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: Option<String>, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    fn secret(&self) -> Result<&[u8], WorkflowError> {
        self.secret
            .as_deref()
            .map(str::as_bytes)
            .ok_or(WorkflowError::SigningSecretMissing)
    }

    pub fn issue(
        &self,
        account: AccountId,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<String, WorkflowError> {
        let key = EncodingKey::from_secret(self.secret()?);
        let (role, landlord_id, tenant_id) = match actor {
            Actor::Landlord(id) => (AccountRole::Landlord, Some(id), None),
            Actor::Tenant(id) => (AccountRole::Tenant, None, Some(id)),
        };
        let claims = SessionClaims {
            sub: account,
            role,
            landlord_id,
            tenant_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &key)
            .map_err(|e| WorkflowError::Credential(format!("sign session token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Actor, WorkflowError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify against an explicit `now`; expiry is checked here rather than by the JWT library
    /// so callers driven by a [`crate::clock::Clock`] agree with the issuer.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Actor, WorkflowError> {
        let key = DecodingKey::from_secret(self.secret()?);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::ExpiredSignature
                | ErrorKind::ImmatureSignature
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::InvalidAlgorithm => WorkflowError::Unauthorized,
                _ => {
                    error!(error = %e, "session token verification failed");
                    WorkflowError::Credential(format!("verify session token: {e}"))
                }
            }
        })?;

        if data.claims.exp <= now.timestamp() {
            return Err(WorkflowError::Unauthorized);
        }
        data.claims.actor().ok_or(WorkflowError::Unauthorized)
    }

    /// Resolve the caller from an `Authorization: Bearer` header.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Actor, WorkflowError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(WorkflowError::Unauthorized)?;
        self.verify(token)
    }
}
