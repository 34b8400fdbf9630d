//! Persistence seam. Each repository call commits on its own; the workflows never assume a
//! multi-statement transaction is available.

mod memory;

pub use memory::{InMemoryStore, StoreOp};

use chrono::{DateTime, Utc};

use crate::domain::{
    Account, InvitationId, MaintenanceRequest, MaintenanceRequestId, Property, PropertyId, Tenant,
    TenantId, TenantInvitation, Unit, UnitId, UnitStatus, Vendor,
};

/// Error enumeration for persistence failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("constraint violated: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub trait PropertyRepository: Send + Sync {
    fn insert_property(&self, property: Property) -> Result<Property, StoreError>;
    fn fetch_property(&self, id: PropertyId) -> Result<Option<Property>, StoreError>;
    fn property_ids(&self) -> Result<Vec<PropertyId>, StoreError>;
    fn set_total_units(&self, id: PropertyId, total_units: u32) -> Result<(), StoreError>;
}

/// Unit rows. Implementations must reject a duplicate `unit_number` within one property.
pub trait UnitRepository: Send + Sync {
    fn insert_unit(&self, unit: Unit) -> Result<Unit, StoreError>;
    fn fetch_unit(&self, id: UnitId) -> Result<Option<Unit>, StoreError>;
    fn update_unit(&self, unit: Unit) -> Result<(), StoreError>;
    fn delete_unit(&self, id: UnitId) -> Result<(), StoreError>;
    fn set_unit_status(&self, id: UnitId, status: UnitStatus) -> Result<(), StoreError>;
    fn units_for_property(&self, property_id: PropertyId) -> Result<Vec<Unit>, StoreError>;
    fn count_units(&self, property_id: PropertyId) -> Result<u32, StoreError>;
}

/// Tenant rows. Implementations must reject a second ACTIVE tenant on the same unit.
pub trait TenantRepository: Send + Sync {
    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, StoreError>;
    fn fetch_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError>;
    fn update_tenant(&self, tenant: Tenant) -> Result<(), StoreError>;
    fn delete_tenant(&self, id: TenantId) -> Result<(), StoreError>;
    fn tenants_for_unit(&self, unit_id: UnitId) -> Result<Vec<Tenant>, StoreError>;
}

pub trait VendorRepository: Send + Sync {
    fn insert_vendor(&self, vendor: Vendor) -> Result<Vendor, StoreError>;
    /// Verified vendors offering `service_type`, in store order.
    fn verified_vendors_offering(&self, service_type: &str) -> Result<Vec<Vendor>, StoreError>;
}

pub trait MaintenanceRepository: Send + Sync {
    fn insert_request(&self, request: MaintenanceRequest)
        -> Result<MaintenanceRequest, StoreError>;
    fn fetch_request(
        &self,
        id: MaintenanceRequestId,
    ) -> Result<Option<MaintenanceRequest>, StoreError>;
    fn find_by_confirmation_token(
        &self,
        token: &str,
    ) -> Result<Option<MaintenanceRequest>, StoreError>;
    fn update_request(&self, request: MaintenanceRequest) -> Result<(), StoreError>;
}

pub trait InvitationRepository: Send + Sync {
    fn insert_invitation(
        &self,
        invitation: TenantInvitation,
    ) -> Result<TenantInvitation, StoreError>;
    fn fetch_invitation(&self, id: InvitationId) -> Result<Option<TenantInvitation>, StoreError>;
    /// Row matching `token` that is unverified and expires after `now`.
    fn find_redeemable(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TenantInvitation>, StoreError>;
    /// Conditional update on the same predicate as [`Self::find_redeemable`]; `None` when no row
    /// matched.
    fn mark_verified(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TenantInvitation>, StoreError>;
    fn update_invitation(&self, invitation: TenantInvitation) -> Result<(), StoreError>;
}

pub trait AccountRepository: Send + Sync {
    fn insert_account(&self, account: Account) -> Result<Account, StoreError>;
    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    fn update_account(&self, account: Account) -> Result<(), StoreError>;
}

/// Tables touched by the occupancy manager.
pub trait OccupancyStore: PropertyRepository + UnitRepository + TenantRepository {}

impl<T> OccupancyStore for T where T: PropertyRepository + UnitRepository + TenantRepository {}

/// Tables touched by vendor dispatch.
pub trait DispatchStore: OccupancyStore + VendorRepository + MaintenanceRepository {}

impl<T> DispatchStore for T where T: OccupancyStore + VendorRepository + MaintenanceRepository {}

/// Tables touched by tenant onboarding.
pub trait OnboardingStore: OccupancyStore + InvitationRepository + AccountRepository {}

impl<T> OnboardingStore for T where T: OccupancyStore + InvitationRepository + AccountRepository {}
