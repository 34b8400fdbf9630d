use serde::Serialize;
use tracing::{info, warn};

use super::credentials::{check_password_policy, hash_password, verify_password};
use super::invitation::OnboardingService;
use crate::domain::{
    Account, AccountId, AccountRole, Actor, LandlordId, Property, Tenant, TenantId, Unit,
};
use crate::store::OnboardingStore;
use crate::workflows::WorkflowError;

/// What the signup page shows before the tenant chooses a password.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationPreview {
    pub tenant: Tenant,
    pub unit: Option<Unit>,
    pub property: Property,
    pub landlord_id: LandlordId,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupOutcome {
    pub account_id: AccountId,
    pub tenant_id: TenantId,
    pub session_token: String,
}

impl<S> OnboardingService<S>
where
    S: OnboardingStore + 'static,
{
    /// Decode a signup token and load the records it points at. Read-only.
    pub fn verify_invitation(&self, signed: &str) -> Result<InvitationPreview, WorkflowError> {
        let claims = self.signup_tokens.verify(signed, self.clock.now())?;

        let tenant = self
            .store
            .fetch_tenant(claims.tenant_id)?
            .filter(|tenant| tenant.landlord_id == claims.landlord_id)
            .ok_or(WorkflowError::InvalidOrExpiredToken)?;
        let property = self
            .store
            .fetch_property(claims.property_id)?
            .ok_or(WorkflowError::NotFound("property"))?;
        let unit = match claims.unit_id {
            Some(unit_id) => self.store.fetch_unit(unit_id)?,
            None => None,
        };

        Ok(InvitationPreview {
            tenant,
            unit,
            property,
            landlord_id: claims.landlord_id,
        })
    }

    /// Set the tenant's password and open a session.
    ///
    /// An existing account with the tenant's email is upgraded to the tenant role; otherwise a
    /// new account is created.
    pub fn complete_signup(
        &self,
        signed: &str,
        password: &str,
    ) -> Result<SignupOutcome, WorkflowError> {
        check_password_policy(password)?;
        let preview = self.verify_invitation(signed)?;
        let tenant = preview.tenant;
        let email = tenant.contact.email.trim().to_ascii_lowercase();
        let now = self.clock.now();

        let account = match self.store.find_account_by_email(&email)? {
            Some(existing)
                if existing.tenant_id == Some(tenant.id) && existing.password_hash.is_some() =>
            {
                return Err(WorkflowError::Conflict(
                    "account setup already completed".to_string(),
                ));
            }
            Some(mut existing) => {
                existing.password_hash = Some(hash_password(password)?);
                existing.role = AccountRole::Tenant;
                existing.tenant_id = Some(tenant.id);
                self.store.update_account(existing.clone())?;
                info!(account_id = %existing.id, tenant_id = %tenant.id, "account upgraded to tenant role");
                existing
            }
            None => {
                let account = self.store.insert_account(Account {
                    id: AccountId::new(),
                    email,
                    password_hash: Some(hash_password(password)?),
                    role: AccountRole::Tenant,
                    tenant_id: Some(tenant.id),
                    landlord_id: None,
                    created_at: now,
                })?;
                info!(account_id = %account.id, tenant_id = %tenant.id, "tenant account created");
                account
            }
        };

        let session_token = self
            .sessions
            .issue(account.id, Actor::Tenant(tenant.id), now)?;
        Ok(SignupOutcome {
            account_id: account.id,
            tenant_id: tenant.id,
            session_token,
        })
    }

    /// Password sign-in for accounts that finished signup.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<String, WorkflowError> {
        let Some(account) = self.store.find_account_by_email(email.trim())? else {
            return Err(WorkflowError::Unauthorized);
        };
        let Some(hash) = account.password_hash.as_deref() else {
            return Err(WorkflowError::Unauthorized);
        };
        if !verify_password(password, hash)? {
            warn!(account_id = %account.id, "sign-in rejected");
            return Err(WorkflowError::Unauthorized);
        }

        let actor = match account.role {
            AccountRole::Tenant => account.tenant_id.map(Actor::Tenant),
            AccountRole::Landlord => account.landlord_id.map(Actor::Landlord),
        }
        .ok_or(WorkflowError::Unauthorized)?;
        self.sessions.issue(account.id, actor, self.clock.now())
    }
}
