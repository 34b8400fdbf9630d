//! Records shared by the occupancy, dispatch, and onboarding workflows.
//!
//! Every table row has its own struct and identifier newtype so records cannot be mixed up as
//! they move between the store and the workflow services.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

record_id!(
    /// Identifier of a `property` row.
    PropertyId
);
record_id!(
    /// Identifier of a `unit` row.
    UnitId
);
record_id!(
    /// Identifier of a `tenant` row.
    TenantId
);
record_id!(
    /// Identifier of the landlord owning properties and tenants.
    LandlordId
);
record_id!(VendorId);
record_id!(MaintenanceRequestId);
record_id!(InvitationId);
record_id!(AccountId);

/// Caller identity threaded explicitly through every workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Landlord(LandlordId),
    Tenant(TenantId),
}

impl Actor {
    pub fn landlord(self) -> Option<LandlordId> {
        match self {
            Actor::Landlord(id) => Some(id),
            Actor::Tenant(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    House,
    Townhouse,
    Apartment,
    Condo,
    MultiFamily,
    Commercial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub owner_id: LandlordId,
    pub name: String,
    pub address: Address,
    pub property_type: PropertyType,
    /// Aggregate of unit rows referencing this property. Written only by the occupancy manager.
    pub total_units: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProperty {
    pub name: String,
    pub address: Address,
    pub property_type: PropertyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Available,
    Occupied,
    Maintenance,
    Unavailable,
    Reserved,
}

impl UnitStatus {
    pub const fn label(self) -> &'static str {
        match self {
            UnitStatus::Available => "AVAILABLE",
            UnitStatus::Occupied => "OCCUPIED",
            UnitStatus::Maintenance => "MAINTENANCE",
            UnitStatus::Unavailable => "UNAVAILABLE",
            UnitStatus::Reserved => "RESERVED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub property_id: PropertyId,
    pub unit_number: String,
    pub status: UnitStatus,
    pub bedrooms: u8,
    pub bathrooms: f32,
    pub area_sqft: Option<u32>,
    /// Monthly rent in cents.
    pub rent: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUnit {
    pub property_id: PropertyId,
    pub unit_number: String,
    #[serde(default = "default_unit_status")]
    pub status: UnitStatus,
    #[serde(default)]
    pub bedrooms: u8,
    #[serde(default)]
    pub bathrooms: f32,
    #[serde(default)]
    pub area_sqft: Option<u32>,
    #[serde(default)]
    pub rent: u64,
}

fn default_unit_status() -> UnitStatus {
    UnitStatus::Available
}

/// Partial update for a unit; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitPatch {
    pub property_id: Option<PropertyId>,
    pub unit_number: Option<String>,
    pub status: Option<UnitStatus>,
    pub bedrooms: Option<u8>,
    pub bathrooms: Option<f32>,
    pub area_sqft: Option<u32>,
    pub rent: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantStatus {
    Active,
    Inactive,
    Evicted,
    MovedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ContactDetails {
    pub first_name: String,
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ContactDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseTerms {
    pub lease_start: NaiveDate,
    pub lease_end: Option<NaiveDate>,
    /// Monthly rent in cents.
    pub rent_amount: u64,
    /// Security deposit in cents.
    pub security_deposit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    /// `None` means the tenant rents the entire property.
    pub unit_id: Option<UnitId>,
    pub contact: ContactDetails,
    pub lease: LeaseTerms,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    pub property_id: PropertyId,
    #[serde(default)]
    pub unit_id: Option<UnitId>,
    pub contact: ContactDetails,
    pub lease: LeaseTerms,
}

/// Partial update for a tenant. `unit_id: Some(None)` moves the tenant to the entire property.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantPatch {
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub unit_id: Option<Option<UnitId>>,
    pub contact: Option<ContactDetails>,
    pub lease: Option<LeaseTerms>,
    pub status: Option<TenantStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub company_name: String,
    pub email: String,
    pub services: Vec<String>,
    pub is_verified: bool,
    /// Average rating in tenths of a star (0..=50).
    pub rating: u8,
}

impl Vendor {
    pub fn offers(&self, service_type: &str) -> bool {
        let wanted = service_type.trim();
        self.services
            .iter()
            .any(|service| service.trim().eq_ignore_ascii_case(wanted))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferredTime {
    pub day: NaiveDate,
    pub slot: TimeSlot,
}

impl fmt::Display for PreferredTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = match self.slot {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
            TimeSlot::Any => "any time",
        };
        write!(f, "{} ({})", self.day.format("%a %b %-d, %Y"), slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    Pending,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub id: MaintenanceRequestId,
    pub description: String,
    pub property_id: PropertyId,
    pub unit_id: Option<UnitId>,
    pub tenant_id: TenantId,
    pub vendor_id: VendorId,
    pub service_type: String,
    pub preferred_times: Vec<PreferredTime>,
    pub status: MaintenanceStatus,
    pub confirmation_token: String,
    pub confirmation_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantInvitation {
    pub id: InvitationId,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    /// `None` invites the tenant to the entire property.
    pub unit_id: Option<UnitId>,
    pub contact: ContactDetails,
    pub lease: LeaseTerms,
    pub verification_token: String,
    pub expires_at: DateTime<Utc>,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub converted_tenant_id: Option<TenantId>,
    pub created_at: DateTime<Utc>,
}

impl TenantInvitation {
    /// Lookup predicate for redemption: unverified and not yet expired.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.is_verified && self.expires_at > now
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvitation {
    pub property_id: PropertyId,
    #[serde(default)]
    pub unit_id: Option<UnitId>,
    pub contact: ContactDetails,
    pub lease: LeaseTerms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    Landlord,
    Tenant,
}

/// Login credentials. Tenant accounts carry the tenant row they act for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: AccountRole,
    pub tenant_id: Option<TenantId>,
    pub landlord_id: Option<LandlordId>,
    pub created_at: DateTime<Utc>,
}
