use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::{LandlordId, PropertyId, Tenant, TenantId, UnitId};
use crate::workflows::WorkflowError;

/// Claims carried by the account-completion link sent to a new tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupClaims {
    pub tenant_id: TenantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed signup token and the moment it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedSignupToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 signer for [`SignupClaims`]. Distinct from the opaque invitation verification token.
#[derive(Debug, Clone)]
pub struct SignupTokens {
    secret: Option<String>,
    ttl: Duration,
}

impl SignupTokens {
    pub fn new(secret: Option<String>, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    fn secret(&self) -> Result<&[u8], WorkflowError> {
        self.secret
            .as_deref()
            .map(str::as_bytes)
            .ok_or(WorkflowError::SigningSecretMissing)
    }

    /// Fail before any write when no secret is configured.
    pub fn ensure_ready(&self) -> Result<(), WorkflowError> {
        self.secret().map(|_| ())
    }

    pub fn issue(
        &self,
        tenant: &Tenant,
        now: DateTime<Utc>,
    ) -> Result<IssuedSignupToken, WorkflowError> {
        let key = EncodingKey::from_secret(self.secret()?);
        let expires_at = now + self.ttl;
        let claims = SignupClaims {
            tenant_id: tenant.id,
            unit_id: tenant.unit_id,
            landlord_id: tenant.landlord_id,
            property_id: tenant.property_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| WorkflowError::Credential(format!("sign signup token: {e}")))?;
        Ok(IssuedSignupToken { token, expires_at })
    }

    /// Check signature and expiry. Tampered, malformed, and expired tokens are indistinguishable.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SignupClaims, WorkflowError> {
        let key = DecodingKey::from_secret(self.secret()?);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<SignupClaims>(token.trim(), &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::ExpiredSignature
                | ErrorKind::ImmatureSignature
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::InvalidAlgorithm => WorkflowError::InvalidOrExpiredToken,
                _ => {
                    error!(error = %e, "signup token verification failed");
                    WorkflowError::Credential(format!("verify signup token: {e}"))
                }
            })?
            .claims;

        if claims.exp <= now.timestamp() {
            return Err(WorkflowError::InvalidOrExpiredToken);
        }
        Ok(claims)
    }
}
