use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{
    AccountRepository, InvitationRepository, MaintenanceRepository, PropertyRepository,
    StoreError, TenantRepository, UnitRepository, VendorRepository,
};
use crate::domain::{
    Account, AccountId, InvitationId, MaintenanceRequest, MaintenanceRequestId, Property,
    PropertyId, Tenant, TenantId, TenantInvitation, Unit, UnitId, UnitStatus, Vendor,
};

/// Write operations that can be made to fail on demand, so partial-failure paths can be
/// exercised without a real database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    InsertProperty,
    SetTotalUnits,
    InsertUnit,
    UpdateUnit,
    DeleteUnit,
    SetUnitStatus,
    InsertTenant,
    UpdateTenant,
    DeleteTenant,
    InsertRequest,
    UpdateRequest,
    InsertInvitation,
    MarkVerified,
    UpdateInvitation,
    InsertAccount,
    UpdateAccount,
}

#[derive(Default)]
struct Tables {
    properties: BTreeMap<PropertyId, Property>,
    units: BTreeMap<UnitId, Unit>,
    tenants: BTreeMap<TenantId, Tenant>,
    vendors: Vec<Vendor>,
    requests: BTreeMap<MaintenanceRequestId, MaintenanceRequest>,
    invitations: BTreeMap<InvitationId, TenantInvitation>,
    accounts: BTreeMap<AccountId, Account>,
}

impl Tables {
    fn unit_number_taken(&self, property_id: PropertyId, number: &str, except: UnitId) -> bool {
        self.units.values().any(|unit| {
            unit.id != except
                && unit.property_id == property_id
                && unit.unit_number.trim().eq_ignore_ascii_case(number.trim())
        })
    }

    fn unit_has_other_active_tenant(&self, unit_id: UnitId, except: TenantId) -> bool {
        self.tenants
            .values()
            .any(|tenant| tenant.id != except && tenant.unit_id == Some(unit_id) && tenant.is_active())
    }

    fn check_tenant_constraints(&self, tenant: &Tenant) -> Result<(), StoreError> {
        if !self.properties.contains_key(&tenant.property_id) {
            return Err(StoreError::Conflict(
                "tenant references a missing property".to_string(),
            ));
        }
        if let Some(unit_id) = tenant.unit_id {
            if !self.units.contains_key(&unit_id) {
                return Err(StoreError::Conflict(
                    "tenant references a missing unit".to_string(),
                ));
            }
            if tenant.is_active() && self.unit_has_other_active_tenant(unit_id, tenant.id) {
                return Err(StoreError::Conflict(
                    "unit already has an active tenant".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Process-local store backing the API service, the demo, and the test suites.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<HashSet<StoreOp>>,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` fail with [`StoreError::Unavailable`].
    pub fn inject_fault(&self, op: StoreOp) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(op);
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    /// Fail every call, reads included.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.offline.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("database offline".to_string()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    fn lock_for(&self, op: StoreOp) -> Result<MutexGuard<'_, Tables>, StoreError> {
        let faulted = self
            .faults
            .lock()
            .map(|faults| faults.contains(&op))
            .unwrap_or(false);
        if faulted {
            return Err(StoreError::Unavailable(format!("{op:?} failed")));
        }
        self.lock()
    }
}

impl PropertyRepository for InMemoryStore {
    fn insert_property(&self, property: Property) -> Result<Property, StoreError> {
        let mut tables = self.lock_for(StoreOp::InsertProperty)?;
        if tables.properties.contains_key(&property.id) {
            return Err(StoreError::Conflict("property already exists".to_string()));
        }
        tables.properties.insert(property.id, property.clone());
        Ok(property)
    }

    fn fetch_property(&self, id: PropertyId) -> Result<Option<Property>, StoreError> {
        Ok(self.lock()?.properties.get(&id).cloned())
    }

    fn property_ids(&self) -> Result<Vec<PropertyId>, StoreError> {
        Ok(self.lock()?.properties.keys().copied().collect())
    }

    fn set_total_units(&self, id: PropertyId, total_units: u32) -> Result<(), StoreError> {
        let mut tables = self.lock_for(StoreOp::SetTotalUnits)?;
        let property = tables.properties.get_mut(&id).ok_or(StoreError::NotFound)?;
        property.total_units = total_units;
        Ok(())
    }
}

impl UnitRepository for InMemoryStore {
    fn insert_unit(&self, unit: Unit) -> Result<Unit, StoreError> {
        let mut tables = self.lock_for(StoreOp::InsertUnit)?;
        if !tables.properties.contains_key(&unit.property_id) {
            return Err(StoreError::Conflict(
                "unit references a missing property".to_string(),
            ));
        }
        if tables.unit_number_taken(unit.property_id, &unit.unit_number, unit.id) {
            return Err(StoreError::Conflict(format!(
                "unit number {} already exists for this property",
                unit.unit_number
            )));
        }
        tables.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    fn fetch_unit(&self, id: UnitId) -> Result<Option<Unit>, StoreError> {
        Ok(self.lock()?.units.get(&id).cloned())
    }

    fn update_unit(&self, unit: Unit) -> Result<(), StoreError> {
        let mut tables = self.lock_for(StoreOp::UpdateUnit)?;
        if !tables.units.contains_key(&unit.id) {
            return Err(StoreError::NotFound);
        }
        if !tables.properties.contains_key(&unit.property_id) {
            return Err(StoreError::Conflict(
                "unit references a missing property".to_string(),
            ));
        }
        if tables.unit_number_taken(unit.property_id, &unit.unit_number, unit.id) {
            return Err(StoreError::Conflict(format!(
                "unit number {} already exists for this property",
                unit.unit_number
            )));
        }
        tables.units.insert(unit.id, unit);
        Ok(())
    }

    fn delete_unit(&self, id: UnitId) -> Result<(), StoreError> {
        let mut tables = self.lock_for(StoreOp::DeleteUnit)?;
        tables.units.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    fn set_unit_status(&self, id: UnitId, status: UnitStatus) -> Result<(), StoreError> {
        let mut tables = self.lock_for(StoreOp::SetUnitStatus)?;
        let unit = tables.units.get_mut(&id).ok_or(StoreError::NotFound)?;
        unit.status = status;
        Ok(())
    }

    fn units_for_property(&self, property_id: PropertyId) -> Result<Vec<Unit>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .units
            .values()
            .filter(|unit| unit.property_id == property_id)
            .cloned()
            .collect())
    }

    fn count_units(&self, property_id: PropertyId) -> Result<u32, StoreError> {
        let tables = self.lock()?;
        let count = tables
            .units
            .values()
            .filter(|unit| unit.property_id == property_id)
            .count();
        u32::try_from(count).map_err(|_| StoreError::Unavailable("unit count overflow".to_string()))
    }
}

impl TenantRepository for InMemoryStore {
    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, StoreError> {
        let mut tables = self.lock_for(StoreOp::InsertTenant)?;
        if tables.tenants.contains_key(&tenant.id) {
            return Err(StoreError::Conflict("tenant already exists".to_string()));
        }
        tables.check_tenant_constraints(&tenant)?;
        tables.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    fn fetch_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        Ok(self.lock()?.tenants.get(&id).cloned())
    }

    fn update_tenant(&self, tenant: Tenant) -> Result<(), StoreError> {
        let mut tables = self.lock_for(StoreOp::UpdateTenant)?;
        if !tables.tenants.contains_key(&tenant.id) {
            return Err(StoreError::NotFound);
        }
        tables.check_tenant_constraints(&tenant)?;
        tables.tenants.insert(tenant.id, tenant);
        Ok(())
    }

    fn delete_tenant(&self, id: TenantId) -> Result<(), StoreError> {
        let mut tables = self.lock_for(StoreOp::DeleteTenant)?;
        tables.tenants.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    fn tenants_for_unit(&self, unit_id: UnitId) -> Result<Vec<Tenant>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .tenants
            .values()
            .filter(|tenant| tenant.unit_id == Some(unit_id))
            .cloned()
            .collect())
    }
}

impl VendorRepository for InMemoryStore {
    fn insert_vendor(&self, vendor: Vendor) -> Result<Vendor, StoreError> {
        let mut tables = self.lock()?;
        if tables.vendors.iter().any(|existing| existing.id == vendor.id) {
            return Err(StoreError::Conflict("vendor already exists".to_string()));
        }
        tables.vendors.push(vendor.clone());
        Ok(vendor)
    }

    fn verified_vendors_offering(&self, service_type: &str) -> Result<Vec<Vendor>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .vendors
            .iter()
            .filter(|vendor| vendor.is_verified && vendor.offers(service_type))
            .cloned()
            .collect())
    }
}

impl MaintenanceRepository for InMemoryStore {
    fn insert_request(
        &self,
        request: MaintenanceRequest,
    ) -> Result<MaintenanceRequest, StoreError> {
        let mut tables = self.lock_for(StoreOp::InsertRequest)?;
        let duplicate_token = tables
            .requests
            .values()
            .any(|existing| existing.confirmation_token == request.confirmation_token);
        if duplicate_token || tables.requests.contains_key(&request.id) {
            return Err(StoreError::Conflict(
                "maintenance request already exists".to_string(),
            ));
        }
        tables.requests.insert(request.id, request.clone());
        Ok(request)
    }

    fn fetch_request(
        &self,
        id: MaintenanceRequestId,
    ) -> Result<Option<MaintenanceRequest>, StoreError> {
        Ok(self.lock()?.requests.get(&id).cloned())
    }

    fn find_by_confirmation_token(
        &self,
        token: &str,
    ) -> Result<Option<MaintenanceRequest>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .requests
            .values()
            .find(|request| request.confirmation_token == token)
            .cloned())
    }

    fn update_request(&self, request: MaintenanceRequest) -> Result<(), StoreError> {
        let mut tables = self.lock_for(StoreOp::UpdateRequest)?;
        let slot = tables.requests.get_mut(&request.id).ok_or(StoreError::NotFound)?;
        *slot = request;
        Ok(())
    }
}

impl InvitationRepository for InMemoryStore {
    fn insert_invitation(
        &self,
        invitation: TenantInvitation,
    ) -> Result<TenantInvitation, StoreError> {
        let mut tables = self.lock_for(StoreOp::InsertInvitation)?;
        let duplicate_token = tables
            .invitations
            .values()
            .any(|existing| existing.verification_token == invitation.verification_token);
        if duplicate_token || tables.invitations.contains_key(&invitation.id) {
            return Err(StoreError::Conflict("invitation already exists".to_string()));
        }
        tables.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    fn fetch_invitation(&self, id: InvitationId) -> Result<Option<TenantInvitation>, StoreError> {
        Ok(self.lock()?.invitations.get(&id).cloned())
    }

    fn find_redeemable(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TenantInvitation>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .invitations
            .values()
            .find(|invitation| invitation.verification_token == token && invitation.is_redeemable(now))
            .cloned())
    }

    fn mark_verified(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TenantInvitation>, StoreError> {
        let mut tables = self.lock_for(StoreOp::MarkVerified)?;
        let Some(invitation) = tables.invitations.values_mut().find(|invitation| {
            invitation.verification_token == token && invitation.is_redeemable(now)
        }) else {
            return Ok(None);
        };
        invitation.is_verified = true;
        invitation.verified_at = Some(now);
        Ok(Some(invitation.clone()))
    }

    fn update_invitation(&self, invitation: TenantInvitation) -> Result<(), StoreError> {
        let mut tables = self.lock_for(StoreOp::UpdateInvitation)?;
        let slot = tables
            .invitations
            .get_mut(&invitation.id)
            .ok_or(StoreError::NotFound)?;
        *slot = invitation;
        Ok(())
    }
}

impl AccountRepository for InMemoryStore {
    fn insert_account(&self, account: Account) -> Result<Account, StoreError> {
        let mut tables = self.lock_for(StoreOp::InsertAccount)?;
        let email_taken = tables
            .accounts
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&account.email));
        if email_taken {
            return Err(StoreError::Conflict("account email already registered".to_string()));
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .accounts
            .values()
            .find(|account| account.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn update_account(&self, account: Account) -> Result<(), StoreError> {
        let mut tables = self.lock_for(StoreOp::UpdateAccount)?;
        let slot = tables.accounts.get_mut(&account.id).ok_or(StoreError::NotFound)?;
        *slot = account;
        Ok(())
    }
}
