use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::clock::{Clock, SystemClock};
use crate::domain::{
    Actor, ContactDetails, LandlordId, LeaseTerms, NewProperty, NewTenant, NewUnit, Property,
    PropertyId, Tenant, TenantId, TenantPatch, TenantStatus, Unit, UnitId, UnitPatch, UnitStatus,
};
use crate::store::OccupancyStore;
use crate::workflows::WorkflowError;

/// Keeps unit occupancy and property unit counts in step with the tenant and unit tables.
///
/// Every multi-step operation issues independent store writes. A failure part-way through is
/// returned to the caller unchanged; [`OccupancyManager::resync_all`] repairs whatever drift
/// it left behind.
pub struct OccupancyManager<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

/// Summary of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
    pub properties_scanned: usize,
    pub counts_corrected: usize,
    pub units_repaired: usize,
}

impl<S> OccupancyManager<S>
where
    S: OccupancyStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn create_property(
        &self,
        actor: Actor,
        input: NewProperty,
    ) -> Result<Property, WorkflowError> {
        let landlord = require_landlord(actor)?;
        if input.name.trim().is_empty() {
            return Err(WorkflowError::Validation("property name is required".to_string()));
        }

        let property = self.store.insert_property(Property {
            id: PropertyId::new(),
            owner_id: landlord,
            name: input.name.trim().to_string(),
            address: input.address,
            property_type: input.property_type,
            total_units: 0,
            created_at: self.clock.now(),
        })?;
        info!(property_id = %property.id, landlord_id = %landlord, "property created");
        Ok(property)
    }

    pub fn property(&self, actor: Actor, id: PropertyId) -> Result<Property, WorkflowError> {
        let landlord = require_landlord(actor)?;
        self.owned_property(landlord, id)
    }

    pub fn units(&self, actor: Actor, property_id: PropertyId) -> Result<Vec<Unit>, WorkflowError> {
        let landlord = require_landlord(actor)?;
        self.owned_property(landlord, property_id)?;
        Ok(self.store.units_for_property(property_id)?)
    }

    pub fn unit(&self, actor: Actor, id: UnitId) -> Result<Unit, WorkflowError> {
        let landlord = require_landlord(actor)?;
        self.owned_unit(landlord, id)
    }

    pub fn tenant(&self, actor: Actor, id: TenantId) -> Result<Tenant, WorkflowError> {
        match actor {
            Actor::Landlord(landlord) => self.owned_tenant(landlord, id),
            Actor::Tenant(own) if own == id => self
                .store
                .fetch_tenant(id)?
                .ok_or(WorkflowError::NotFound("tenant")),
            Actor::Tenant(_) => Err(WorkflowError::NotFound("tenant")),
        }
    }

    pub fn create_unit(&self, actor: Actor, input: NewUnit) -> Result<Unit, WorkflowError> {
        let landlord = require_landlord(actor)?;
        let unit_number = input.unit_number.trim();
        if unit_number.is_empty() {
            return Err(WorkflowError::Validation("unit_number is required".to_string()));
        }
        if input.status == UnitStatus::Occupied {
            return Err(WorkflowError::Validation(
                "a new unit cannot start out occupied".to_string(),
            ));
        }
        self.owned_property(landlord, input.property_id)?;

        let unit = self.store.insert_unit(Unit {
            id: UnitId::new(),
            property_id: input.property_id,
            unit_number: unit_number.to_string(),
            status: input.status,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            area_sqft: input.area_sqft,
            rent: input.rent,
        })?;
        info!(unit_id = %unit.id, property_id = %unit.property_id, unit_number = %unit.unit_number, "unit created");

        self.recompute_property_unit_count(unit.property_id)?;
        Ok(unit)
    }

    pub fn update_unit(
        &self,
        actor: Actor,
        id: UnitId,
        patch: UnitPatch,
    ) -> Result<Unit, WorkflowError> {
        let landlord = require_landlord(actor)?;
        let current = self.owned_unit(landlord, id)?;
        let occupied = self.has_active_tenant(id)?;

        let moved_to = patch
            .property_id
            .filter(|target| *target != current.property_id);
        if let Some(target) = moved_to {
            self.owned_property(landlord, target)?;
            if occupied {
                return Err(WorkflowError::Conflict(
                    "cannot move a unit with an active tenant to another property".to_string(),
                ));
            }
        }

        match patch.status {
            Some(UnitStatus::Occupied) if !occupied => {
                return Err(WorkflowError::Validation(
                    "OCCUPIED is set by assigning a tenant".to_string(),
                ));
            }
            Some(status) if occupied && status != UnitStatus::Occupied => {
                return Err(WorkflowError::Conflict(
                    "unit has an active tenant".to_string(),
                ));
            }
            _ => {}
        }

        let mut unit = current.clone();
        if let Some(number) = patch.unit_number {
            let number = number.trim();
            if number.is_empty() {
                return Err(WorkflowError::Validation("unit_number is required".to_string()));
            }
            unit.unit_number = number.to_string();
        }
        if let Some(target) = moved_to {
            unit.property_id = target;
        }
        if let Some(status) = patch.status {
            unit.status = status;
        }
        if let Some(bedrooms) = patch.bedrooms {
            unit.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = patch.bathrooms {
            unit.bathrooms = bathrooms;
        }
        if let Some(area) = patch.area_sqft {
            unit.area_sqft = Some(area);
        }
        if let Some(rent) = patch.rent {
            unit.rent = rent;
        }

        self.store.update_unit(unit.clone())?;
        debug!(unit_id = %unit.id, "unit updated");

        if let Some(target) = moved_to {
            info!(unit_id = %unit.id, from = %current.property_id, to = %target, "unit moved between properties");
            self.recompute_property_unit_count(target)?;
            self.recompute_property_unit_count(current.property_id)?;
        }
        Ok(unit)
    }

    pub fn delete_unit(&self, actor: Actor, id: UnitId) -> Result<(), WorkflowError> {
        let landlord = require_landlord(actor)?;
        let unit = self.owned_unit(landlord, id)?;
        if self.has_active_tenant(id)? {
            return Err(WorkflowError::Conflict(
                "unit has an active tenant".to_string(),
            ));
        }

        self.store.delete_unit(id)?;
        info!(unit_id = %id, property_id = %unit.property_id, "unit deleted");
        self.recompute_property_unit_count(unit.property_id)?;
        Ok(())
    }

    pub fn create_tenant(&self, actor: Actor, input: NewTenant) -> Result<Tenant, WorkflowError> {
        self.create_tenant_with_id(actor, TenantId::new(), input)
    }

    /// Same as [`Self::create_tenant`] with an identifier chosen by the caller.
    pub(crate) fn create_tenant_with_id(
        &self,
        actor: Actor,
        id: TenantId,
        input: NewTenant,
    ) -> Result<Tenant, WorkflowError> {
        let landlord = require_landlord(actor)?;
        validate_contact(&input.contact)?;
        validate_lease(&input.lease)?;
        self.owned_property(landlord, input.property_id)?;
        if let Some(unit_id) = input.unit_id {
            self.assignable_unit(landlord, unit_id, input.property_id)?;
        }

        let tenant = self.store.insert_tenant(Tenant {
            id,
            landlord_id: landlord,
            property_id: input.property_id,
            unit_id: input.unit_id,
            contact: input.contact,
            lease: input.lease,
            status: TenantStatus::Active,
            created_at: self.clock.now(),
        })?;
        info!(tenant_id = %tenant.id, unit_id = ?tenant.unit_id, property_id = %tenant.property_id, "tenant created");

        if let Some(unit_id) = tenant.unit_id {
            self.occupy(unit_id)?;
        }
        self.recompute_property_unit_count(tenant.property_id)?;
        Ok(tenant)
    }

    pub fn update_tenant(
        &self,
        actor: Actor,
        id: TenantId,
        patch: TenantPatch,
    ) -> Result<Tenant, WorkflowError> {
        let landlord = require_landlord(actor)?;
        let current = self.owned_tenant(landlord, id)?;

        let mut tenant = current.clone();
        if let Some(target) = patch.unit_id {
            if let Some(unit_id) = target {
                let unit = self.owned_unit(landlord, unit_id)?;
                if target != current.unit_id && self.has_active_tenant(unit_id)? {
                    return Err(WorkflowError::Conflict(
                        "unit already has an active tenant".to_string(),
                    ));
                }
                tenant.property_id = unit.property_id;
            }
            tenant.unit_id = target;
        }
        if let Some(contact) = patch.contact {
            validate_contact(&contact)?;
            tenant.contact = contact;
        }
        if let Some(lease) = patch.lease {
            validate_lease(&lease)?;
            tenant.lease = lease;
        }
        if let Some(status) = patch.status {
            tenant.status = status;
        }

        self.store.update_tenant(tenant.clone())?;
        debug!(tenant_id = %id, "tenant updated");

        let held_before = current.unit_id.filter(|_| current.is_active());
        let held_after = tenant.unit_id.filter(|_| tenant.is_active());
        if held_before != held_after {
            if let Some(unit_id) = held_after {
                self.occupy(unit_id)?;
            }
            if let Some(unit_id) = held_before {
                self.release(unit_id)?;
            }
            info!(tenant_id = %id, from = ?held_before, to = ?held_after, "tenant reassigned");
        } else if let (Some(_), Some(unit_id)) = (patch.unit_id, held_after) {
            self.occupy(unit_id)?;
        }

        let affected: BTreeSet<PropertyId> = [current.property_id, tenant.property_id].into();
        for property_id in affected {
            self.recompute_property_unit_count(property_id)?;
        }
        Ok(tenant)
    }

    pub fn delete_tenant(&self, actor: Actor, id: TenantId) -> Result<(), WorkflowError> {
        let landlord = require_landlord(actor)?;
        let tenant = self.owned_tenant(landlord, id)?;

        self.store.delete_tenant(id)?;
        info!(tenant_id = %id, unit_id = ?tenant.unit_id, "tenant deleted");

        if let Some(unit_id) = tenant.unit_id {
            self.release(unit_id)?;
        }
        self.recompute_property_unit_count(tenant.property_id)?;
        Ok(())
    }

    /// Count the unit rows for `property_id` and store the result as `total_units`.
    pub fn recompute_property_unit_count(&self, property_id: PropertyId) -> Result<u32, WorkflowError> {
        let count = self.store.count_units(property_id)?;
        self.store.set_total_units(property_id, count)?;
        debug!(%property_id, total_units = count, "property unit count recomputed");
        Ok(count)
    }

    /// Reconcile every property: unit counts and AVAILABLE/OCCUPIED status against active tenants.
    pub fn resync_all(&self) -> Result<ResyncReport, WorkflowError> {
        let ids = self.store.property_ids()?;
        self.resync_properties(ids)
    }

    /// Reconcile only the properties owned by the calling landlord.
    pub fn resync_owned(&self, actor: Actor) -> Result<ResyncReport, WorkflowError> {
        let landlord = require_landlord(actor)?;
        let mut owned = Vec::new();
        for id in self.store.property_ids()? {
            if let Some(property) = self.store.fetch_property(id)? {
                if property.owner_id == landlord {
                    owned.push(id);
                }
            }
        }
        self.resync_properties(owned)
    }

    fn resync_properties(&self, ids: Vec<PropertyId>) -> Result<ResyncReport, WorkflowError> {
        let mut report = ResyncReport::default();
        for id in ids {
            let Some(property) = self.store.fetch_property(id)? else {
                continue;
            };
            report.properties_scanned += 1;

            for unit in self.store.units_for_property(id)? {
                let desired = if self.has_active_tenant(unit.id)? {
                    UnitStatus::Occupied
                } else if unit.status == UnitStatus::Occupied {
                    UnitStatus::Available
                } else {
                    unit.status
                };
                if desired != unit.status {
                    warn!(unit_id = %unit.id, from = unit.status.label(), to = desired.label(), "repairing unit status");
                    self.store.set_unit_status(unit.id, desired)?;
                    report.units_repaired += 1;
                }
            }

            let count = self.recompute_property_unit_count(id)?;
            if count != property.total_units {
                warn!(property_id = %id, stored = property.total_units, actual = count, "corrected unit count drift");
                report.counts_corrected += 1;
            }
        }

        info!(
            properties = report.properties_scanned,
            counts_corrected = report.counts_corrected,
            units_repaired = report.units_repaired,
            "resync complete"
        );
        Ok(report)
    }

    pub(crate) fn owned_property(
        &self,
        landlord: LandlordId,
        id: PropertyId,
    ) -> Result<Property, WorkflowError> {
        self.store
            .fetch_property(id)?
            .filter(|property| property.owner_id == landlord)
            .ok_or(WorkflowError::NotFound("property"))
    }

    pub(crate) fn owned_unit(&self, landlord: LandlordId, id: UnitId) -> Result<Unit, WorkflowError> {
        let unit = self
            .store
            .fetch_unit(id)?
            .ok_or(WorkflowError::NotFound("unit"))?;
        self.owned_property(landlord, unit.property_id)
            .map_err(|_| WorkflowError::NotFound("unit"))?;
        Ok(unit)
    }

    fn owned_tenant(&self, landlord: LandlordId, id: TenantId) -> Result<Tenant, WorkflowError> {
        self.store
            .fetch_tenant(id)?
            .filter(|tenant| tenant.landlord_id == landlord)
            .ok_or(WorkflowError::NotFound("tenant"))
    }

    /// A unit of `property_id` that no active tenant holds yet.
    pub(crate) fn assignable_unit(
        &self,
        landlord: LandlordId,
        unit_id: UnitId,
        property_id: PropertyId,
    ) -> Result<Unit, WorkflowError> {
        let unit = self.owned_unit(landlord, unit_id)?;
        if unit.property_id != property_id {
            return Err(WorkflowError::NotFound("unit"));
        }
        if self.has_active_tenant(unit_id)? {
            return Err(WorkflowError::Conflict(
                "unit already has an active tenant".to_string(),
            ));
        }
        Ok(unit)
    }

    fn has_active_tenant(&self, unit_id: UnitId) -> Result<bool, WorkflowError> {
        Ok(self
            .store
            .tenants_for_unit(unit_id)?
            .iter()
            .any(Tenant::is_active))
    }

    fn occupy(&self, unit_id: UnitId) -> Result<(), WorkflowError> {
        self.store.set_unit_status(unit_id, UnitStatus::Occupied)?;
        debug!(%unit_id, "unit occupied");
        Ok(())
    }

    /// Flip OCCUPIED back to AVAILABLE once no active tenant remains. Other statuses are
    /// landlord decisions and stay as they are.
    fn release(&self, unit_id: UnitId) -> Result<(), WorkflowError> {
        let Some(unit) = self.store.fetch_unit(unit_id)? else {
            return Ok(());
        };
        if unit.status == UnitStatus::Occupied && !self.has_active_tenant(unit_id)? {
            self.store.set_unit_status(unit_id, UnitStatus::Available)?;
            debug!(%unit_id, "unit released");
        }
        Ok(())
    }
}

pub(crate) fn require_landlord(actor: Actor) -> Result<LandlordId, WorkflowError> {
    actor.landlord().ok_or(WorkflowError::Unauthorized)
}

pub(crate) fn validate_contact(contact: &ContactDetails) -> Result<(), WorkflowError> {
    if contact.first_name.trim().is_empty() || contact.last_name.trim().is_empty() {
        return Err(WorkflowError::Validation("tenant name is required".to_string()));
    }
    contact.validate().map_err(|errors| {
        debug!(%errors, "contact details rejected");
        WorkflowError::Validation(format!("invalid email address: {}", contact.email))
    })
}

pub(crate) fn validate_lease(lease: &LeaseTerms) -> Result<(), WorkflowError> {
    if let Some(end) = lease.lease_end {
        if end <= lease.lease_start {
            return Err(WorkflowError::Validation(
                "lease_end must fall after lease_start".to_string(),
            ));
        }
    }
    Ok(())
}
