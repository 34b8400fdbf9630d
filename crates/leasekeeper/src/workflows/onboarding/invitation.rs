use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::claims::SignupTokens;
use crate::clock::{Clock, SystemClock};
use crate::domain::{
    Actor, InvitationId, NewInvitation, NewTenant, Tenant, TenantId, TenantInvitation,
};
use crate::notify::{templates, Notifier};
use crate::session::SessionKeys;
use crate::store::OnboardingStore;
use crate::tokens::generate_opaque_token;
use crate::workflows::occupancy::service::{require_landlord, validate_contact, validate_lease};
use crate::workflows::occupancy::OccupancyManager;
use crate::workflows::WorkflowError;

#[derive(Debug, Clone)]
pub struct OnboardingSettings {
    pub base_url: String,
    pub invitation_ttl: Duration,
}

impl OnboardingSettings {
    pub fn new(base_url: impl Into<String>, invitation_ttl: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            invitation_ttl,
        }
    }
}

/// A tenant row that was just created, with the account-completion token mailed to them.
#[derive(Debug, Clone, Serialize)]
pub struct AdmittedTenant {
    pub tenant: Tenant,
    #[serde(skip)]
    pub signup_token: String,
    pub signup_expires_at: DateTime<Utc>,
}

/// Invitation issuance and redemption, tenant admission, and account completion.
///
/// Two tokens protect the journey: the opaque single-use `verification_token` on the
/// invitation row, and the signed claims token in the signup link.
pub struct OnboardingService<S> {
    pub(super) store: Arc<S>,
    pub(super) occupancy: Arc<OccupancyManager<S>>,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) signup_tokens: SignupTokens,
    pub(super) sessions: Arc<SessionKeys>,
    pub(super) settings: OnboardingSettings,
}

impl<S> OnboardingService<S>
where
    S: OnboardingStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        occupancy: Arc<OccupancyManager<S>>,
        notifier: Arc<dyn Notifier>,
        signup_tokens: SignupTokens,
        sessions: Arc<SessionKeys>,
        settings: OnboardingSettings,
    ) -> Self {
        Self {
            store,
            occupancy,
            notifier,
            clock: Arc::new(SystemClock),
            signup_tokens,
            sessions,
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persist an unverified invitation. The returned row is the only place the raw
    /// verification token is exposed.
    pub fn create_invitation(
        &self,
        actor: Actor,
        input: NewInvitation,
    ) -> Result<TenantInvitation, WorkflowError> {
        let landlord = require_landlord(actor)?;
        validate_contact(&input.contact)?;
        validate_lease(&input.lease)?;
        self.occupancy.owned_property(landlord, input.property_id)?;
        if let Some(unit_id) = input.unit_id {
            self.occupancy
                .assignable_unit(landlord, unit_id, input.property_id)?;
        }

        let now = self.clock.now();
        let invitation = self.store.insert_invitation(TenantInvitation {
            id: InvitationId::new(),
            landlord_id: landlord,
            property_id: input.property_id,
            unit_id: input.unit_id,
            contact: input.contact,
            lease: input.lease,
            verification_token: generate_opaque_token(),
            expires_at: now + self.settings.invitation_ttl,
            is_verified: false,
            verified_at: None,
            converted_tenant_id: None,
            created_at: now,
        })?;
        info!(
            invitation_id = %invitation.id,
            property_id = %invitation.property_id,
            unit_id = ?invitation.unit_id,
            expires_at = %invitation.expires_at,
            "tenant invitation issued"
        );
        Ok(invitation)
    }

    /// Unverified, unexpired invitation for `token`. Wrong, used, and expired tokens all fail
    /// the same way.
    pub fn invitation_by_token(&self, token: &str) -> Result<TenantInvitation, WorkflowError> {
        self.store
            .find_redeemable(token.trim(), self.clock.now())?
            .ok_or(WorkflowError::InvalidOrExpiredToken)
    }

    /// Single-use: a second call with the same token no longer matches.
    pub fn mark_verified(&self, token: &str) -> Result<TenantInvitation, WorkflowError> {
        let invitation = self
            .store
            .mark_verified(token.trim(), self.clock.now())?
            .ok_or(WorkflowError::InvalidOrExpiredToken)?;
        info!(invitation_id = %invitation.id, "tenant invitation verified");
        Ok(invitation)
    }

    /// Turn a verified invitation into an active tenant, occupying its unit.
    ///
    /// The tenant id is recorded on the invitation before the tenant row is written, so a
    /// conversion interrupted by a store failure can be retried without creating a second tenant.
    pub fn convert_to_tenant(
        &self,
        actor: Actor,
        invitation_id: InvitationId,
    ) -> Result<AdmittedTenant, WorkflowError> {
        let landlord = require_landlord(actor)?;
        let mut invitation = self
            .store
            .fetch_invitation(invitation_id)?
            .filter(|invitation| invitation.landlord_id == landlord)
            .ok_or(WorkflowError::NotFound("invitation"))?;

        if !invitation.is_verified {
            return Err(WorkflowError::Conflict(
                "invitation has not been verified".to_string(),
            ));
        }

        let tenant_id = match invitation.converted_tenant_id {
            Some(tenant_id) if self.store.fetch_tenant(tenant_id)?.is_some() => {
                return Err(WorkflowError::Conflict(format!(
                    "invitation already converted to tenant {tenant_id}"
                )));
            }
            Some(tenant_id) => {
                warn!(%invitation_id, %tenant_id, "resuming interrupted invitation conversion");
                tenant_id
            }
            None => {
                self.signup_tokens.ensure_ready()?;
                let tenant_id = TenantId::new();
                invitation.converted_tenant_id = Some(tenant_id);
                self.store.update_invitation(invitation.clone())?;
                tenant_id
            }
        };

        let admitted = self.admit_tenant_with_id(
            actor,
            tenant_id,
            NewTenant {
                property_id: invitation.property_id,
                unit_id: invitation.unit_id,
                contact: invitation.contact,
                lease: invitation.lease,
            },
        )?;
        info!(%invitation_id, %tenant_id, "invitation converted to tenant");
        Ok(admitted)
    }

    /// Invitee-facing redemption: verify the opaque token, then convert on the landlord's behalf.
    pub fn redeem_invitation(&self, token: &str) -> Result<AdmittedTenant, WorkflowError> {
        let invitation = self.invitation_by_token(token)?;
        self.signup_tokens.ensure_ready()?;
        let invitation = self.mark_verified(&invitation.verification_token)?;
        self.convert_to_tenant(Actor::Landlord(invitation.landlord_id), invitation.id)
    }

    /// Landlord's direct path: create the tenant and mail the signup link.
    pub fn admit_tenant(
        &self,
        actor: Actor,
        input: NewTenant,
    ) -> Result<AdmittedTenant, WorkflowError> {
        self.admit_tenant_with_id(actor, TenantId::new(), input)
    }

    fn admit_tenant_with_id(
        &self,
        actor: Actor,
        tenant_id: TenantId,
        input: NewTenant,
    ) -> Result<AdmittedTenant, WorkflowError> {
        self.signup_tokens.ensure_ready()?;
        let tenant = self
            .occupancy
            .create_tenant_with_id(actor, tenant_id, input)?;
        let issued = self.signup_tokens.issue(&tenant, self.clock.now())?;
        self.send_signup_link(&tenant, &issued.token, issued.expires_at);

        Ok(AdmittedTenant {
            tenant,
            signup_token: issued.token,
            signup_expires_at: issued.expires_at,
        })
    }

    pub fn signup_link(&self, token: &str) -> String {
        format!("{}/tenant/signup?token={token}", self.settings.base_url)
    }

    fn send_signup_link(&self, tenant: &Tenant, token: &str, expires_at: DateTime<Utc>) {
        let property = match self.store.fetch_property(tenant.property_id) {
            Ok(Some(property)) => property,
            Ok(None) => {
                warn!(tenant_id = %tenant.id, "property vanished before signup email");
                return;
            }
            Err(err) => {
                error!(tenant_id = %tenant.id, error = %err, "could not load property for signup email");
                return;
            }
        };
        let unit = tenant
            .unit_id
            .and_then(|unit_id| self.store.fetch_unit(unit_id).ok().flatten());

        let message = templates::tenant_signup(
            tenant,
            &property,
            unit.as_ref(),
            &self.signup_link(token),
            expires_at,
        );
        match self.notifier.notify(message) {
            Ok(()) => info!(tenant_id = %tenant.id, "signup link queued"),
            Err(err) => error!(tenant_id = %tenant.id, error = %err, "signup link not queued"),
        }
    }
}
