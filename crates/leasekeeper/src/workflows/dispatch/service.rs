use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::domain::{
    Actor, MaintenanceRequest, MaintenanceRequestId, MaintenanceStatus, PreferredTime, Property,
    PropertyId, TenantId, UnitId, Vendor,
};
use crate::notify::{templates, Notifier};
use crate::store::DispatchStore;
use crate::tokens::generate_opaque_token;
use crate::workflows::WorkflowError;

/// Wire form of a maintenance request. Every field is optional so a missing one surfaces as a
/// validation error instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaintenanceRequestInput {
    pub description: Option<String>,
    pub property_id: Option<PropertyId>,
    pub unit_id: Option<UnitId>,
    pub preferred_times: Option<Vec<PreferredTime>>,
    pub service_type: Option<String>,
    pub tenant_id: Option<TenantId>,
}

/// A request whose required fields are all present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceDraft {
    pub description: String,
    pub property_id: PropertyId,
    pub unit_id: Option<UnitId>,
    pub preferred_times: Vec<PreferredTime>,
    pub service_type: String,
    pub tenant_id: TenantId,
}

impl TryFrom<MaintenanceRequestInput> for MaintenanceDraft {
    type Error = WorkflowError;

    fn try_from(input: MaintenanceRequestInput) -> Result<Self, Self::Error> {
        let description = non_blank(input.description);
        let service_type = non_blank(input.service_type);
        let preferred_times = input.preferred_times.filter(|times| !times.is_empty());

        match (
            description,
            input.property_id,
            preferred_times,
            service_type,
            input.tenant_id,
        ) {
            (
                Some(description),
                Some(property_id),
                Some(preferred_times),
                Some(service_type),
                Some(tenant_id),
            ) => Ok(Self {
                description,
                property_id,
                unit_id: input.unit_id,
                preferred_times,
                service_type,
                tenant_id,
            }),
            _ => Err(WorkflowError::missing_fields()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Routes maintenance requests to a qualified vendor and tracks their confirmation.
pub struct MaintenanceDispatcher<S> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    base_url: String,
    confirmation_ttl: Duration,
}

impl<S> MaintenanceDispatcher<S>
where
    S: DispatchStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        base_url: impl Into<String>,
        confirmation_ttl: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(SystemClock),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            confirmation_ttl,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate, pick a vendor, persist the request, then queue the vendor email.
    ///
    /// Nothing is written unless a vendor was found. Once the row is stored the request counts
    /// as created; a notifier failure is logged and the stored request is still returned.
    pub fn create_request(
        &self,
        actor: Actor,
        input: MaintenanceRequestInput,
    ) -> Result<MaintenanceRequest, WorkflowError> {
        let draft = MaintenanceDraft::try_from(input)?;
        let property = self.authorize(actor, &draft)?;
        let vendor = self.assign_vendor(&draft.service_type)?;

        let now = self.clock.now();
        let request = self.store.insert_request(MaintenanceRequest {
            id: MaintenanceRequestId::new(),
            description: draft.description,
            property_id: draft.property_id,
            unit_id: draft.unit_id,
            tenant_id: draft.tenant_id,
            vendor_id: vendor.id,
            service_type: draft.service_type,
            preferred_times: draft.preferred_times,
            status: MaintenanceStatus::Pending,
            confirmation_token: generate_opaque_token(),
            confirmation_expires_at: now + self.confirmation_ttl,
            created_at: now,
            confirmed_at: None,
        })?;
        info!(
            request_id = %request.id,
            vendor_id = %vendor.id,
            property_id = %request.property_id,
            service_type = %request.service_type,
            "maintenance request dispatched"
        );

        let link = self.confirmation_link(&request.confirmation_token);
        let message = templates::maintenance_dispatch(&vendor, &request, &property, &link);
        if let Err(err) = self.notifier.notify(message) {
            error!(request_id = %request.id, vendor_id = %vendor.id, error = %err, "vendor notification not queued");
        }

        Ok(request)
    }

    /// First verified vendor offering `service_type`, in store order.
    pub fn assign_vendor(&self, service_type: &str) -> Result<Vendor, WorkflowError> {
        let service_type = service_type.trim();
        self.store
            .verified_vendors_offering(service_type)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                warn!(%service_type, "no verified vendor offers this service");
                WorkflowError::NoVendorAvailable
            })
    }

    /// Request still awaiting confirmation under `token`. Read-only.
    pub fn pending_confirmation(&self, token: &str) -> Result<MaintenanceRequest, WorkflowError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(WorkflowError::InvalidOrExpiredToken);
        }

        let now = self.clock.now();
        self.store
            .find_by_confirmation_token(token)?
            .filter(|request| {
                request.status == MaintenanceStatus::Pending && request.confirmation_expires_at > now
            })
            .ok_or(WorkflowError::InvalidOrExpiredToken)
    }

    /// Redeem a vendor confirmation token: PENDING becomes CONFIRMED exactly once.
    pub fn confirm(&self, token: &str) -> Result<MaintenanceRequest, WorkflowError> {
        let mut request = self.pending_confirmation(token)?;
        let now = self.clock.now();
        request.status = MaintenanceStatus::Confirmed;
        request.confirmed_at = Some(now);
        self.store.update_request(request.clone())?;
        info!(request_id = %request.id, vendor_id = %request.vendor_id, "maintenance appointment confirmed");
        Ok(request)
    }

    pub fn request(
        &self,
        actor: Actor,
        id: MaintenanceRequestId,
    ) -> Result<MaintenanceRequest, WorkflowError> {
        let request = self
            .store
            .fetch_request(id)?
            .ok_or(WorkflowError::NotFound("maintenance request"))?;
        let visible = match actor {
            Actor::Tenant(tenant_id) => request.tenant_id == tenant_id,
            Actor::Landlord(landlord) => self
                .store
                .fetch_property(request.property_id)?
                .is_some_and(|property| property.owner_id == landlord),
        };
        if visible {
            Ok(request)
        } else {
            Err(WorkflowError::NotFound("maintenance request"))
        }
    }

    pub fn confirmation_link(&self, token: &str) -> String {
        format!("{}/api/v1/maintenance/confirm?token={token}", self.base_url)
    }

    fn authorize(
        &self,
        actor: Actor,
        draft: &MaintenanceDraft,
    ) -> Result<Property, WorkflowError> {
        let property = self
            .store
            .fetch_property(draft.property_id)?
            .ok_or(WorkflowError::NotFound("property"))?;
        let tenant = self
            .store
            .fetch_tenant(draft.tenant_id)?
            .ok_or(WorkflowError::NotFound("tenant"))?;

        let in_scope = match actor {
            Actor::Tenant(caller) => caller == tenant.id,
            Actor::Landlord(landlord) => {
                property.owner_id == landlord && tenant.landlord_id == landlord
            }
        };
        if !in_scope {
            return Err(WorkflowError::NotFound("tenant"));
        }
        if tenant.property_id != property.id {
            return Err(WorkflowError::NotFound("property"));
        }

        if let Some(unit_id) = draft.unit_id {
            self.store
                .fetch_unit(unit_id)?
                .filter(|unit| unit.property_id == property.id)
                .ok_or(WorkflowError::NotFound("unit"))?;
        }
        Ok(property)
    }
}
