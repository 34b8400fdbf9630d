use std::sync::Arc;

use axum::response::Response;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::domain::{
    AccountId, Actor, Address, ContactDetails, LandlordId, LeaseTerms, NewProperty, NewTenant,
    NewUnit, Property, PropertyId, PropertyType, UnitId, UnitStatus,
};
use crate::session::SessionKeys;
use crate::store::InMemoryStore;
use crate::workflows::occupancy::OccupancyManager;

pub(super) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub manager: OccupancyManager<InMemoryStore>,
    pub landlord: Actor,
}

pub(super) fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::at(
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).single().expect("valid timestamp"),
    ));
    Fixture {
        manager: OccupancyManager::with_clock(Arc::clone(&store), clock),
        store,
        landlord: Actor::Landlord(LandlordId::new()),
    }
}

pub(super) fn new_property(name: &str, property_type: PropertyType) -> NewProperty {
    NewProperty {
        name: name.to_string(),
        address: Address {
            street: "410 Maple Ave".to_string(),
            city: "Des Moines".to_string(),
            state: "IA".to_string(),
            postal_code: "50309".to_string(),
        },
        property_type,
    }
}

pub(super) fn new_unit(property_id: PropertyId, number: &str) -> NewUnit {
    NewUnit {
        property_id,
        unit_number: number.to_string(),
        status: UnitStatus::Available,
        bedrooms: 2,
        bathrooms: 1.0,
        area_sqft: Some(850),
        rent: 125_000,
    }
}

pub(super) fn contact(first_name: &str) -> ContactDetails {
    ContactDetails {
        first_name: first_name.to_string(),
        last_name: "Rivera".to_string(),
        email: format!("{}@example.com", first_name.to_ascii_lowercase()),
        phone: None,
    }
}

pub(super) fn lease() -> LeaseTerms {
    LeaseTerms {
        lease_start: NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date"),
        lease_end: NaiveDate::from_ymd_opt(2026, 3, 31),
        rent_amount: 125_000,
        security_deposit: 125_000,
    }
}

pub(super) fn new_tenant(property_id: PropertyId, unit_id: Option<UnitId>) -> NewTenant {
    NewTenant {
        property_id,
        unit_id,
        contact: contact("Dana"),
        lease: lease(),
    }
}

impl Fixture {
    pub fn property(&self, name: &str) -> Property {
        self.manager
            .create_property(self.landlord, new_property(name, PropertyType::Apartment))
            .expect("property created")
    }

    pub fn unit_status(&self, id: UnitId) -> UnitStatus {
        self.manager
            .unit(self.landlord, id)
            .expect("unit readable")
            .status
    }

    pub fn total_units(&self, id: PropertyId) -> u32 {
        self.manager
            .property(self.landlord, id)
            .expect("property readable")
            .total_units
    }
}

pub(super) fn session_keys() -> Arc<SessionKeys> {
    Arc::new(SessionKeys::new(
        Some("occupancy-test-secret".to_string()),
        Duration::hours(1),
    ))
}

pub(super) fn bearer(keys: &SessionKeys, actor: Actor) -> String {
    let token = keys
        .issue(AccountId::new(), actor, Utc::now())
        .expect("session token issues");
    format!("Bearer {token}")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is json")
}
