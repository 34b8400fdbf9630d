use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use crate::clock::{Clock, FixedClock};
use crate::domain::{
    AccountId, Actor, Address, ContactDetails, LandlordId, LeaseTerms, NewInvitation,
    NewProperty, NewTenant, NewUnit, Property, PropertyType, Unit, UnitStatus,
};
use crate::notify::OutboundQueue;
use crate::session::SessionKeys;
use crate::store::InMemoryStore;
use crate::workflows::occupancy::OccupancyManager;
use crate::workflows::onboarding::{OnboardingService, OnboardingSettings, SignupTokens};

pub(super) const BASE_URL: &str = "https://app.leasekeeper.test";

pub(super) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<FixedClock>,
    pub outbox: Arc<OutboundQueue>,
    pub sessions: Arc<SessionKeys>,
    pub occupancy: Arc<OccupancyManager<InMemoryStore>>,
    pub service: OnboardingService<InMemoryStore>,
    pub landlord: Actor,
    pub property: Property,
    pub unit: Unit,
}

pub(super) fn fixture() -> Fixture {
    fixture_with_secret(Some("signup-test-secret".to_string()))
}

pub(super) fn fixture_with_secret(signup_secret: Option<String>) -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::at(
        Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).single().expect("valid timestamp"),
    ));
    let outbox = Arc::new(OutboundQueue::new(3));
    let sessions = Arc::new(SessionKeys::new(
        Some("session-test-secret".to_string()),
        Duration::hours(12),
    ));
    let landlord = Actor::Landlord(LandlordId::new());

    let occupancy = Arc::new(OccupancyManager::with_clock(
        Arc::clone(&store),
        clock.clone(),
    ));
    let property = occupancy
        .create_property(
            landlord,
            NewProperty {
                name: "Linden Court".to_string(),
                address: Address {
                    street: "8 Linden Ct".to_string(),
                    city: "Ames".to_string(),
                    state: "IA".to_string(),
                    postal_code: "50010".to_string(),
                },
                property_type: PropertyType::Apartment,
            },
        )
        .expect("property");
    let unit = occupancy
        .create_unit(
            landlord,
            NewUnit {
                property_id: property.id,
                unit_number: "4B".to_string(),
                status: UnitStatus::Available,
                bedrooms: 2,
                bathrooms: 1.5,
                area_sqft: Some(910),
                rent: 132_500,
            },
        )
        .expect("unit");

    let service = OnboardingService::new(
        Arc::clone(&store),
        Arc::clone(&occupancy),
        outbox.clone(),
        SignupTokens::new(signup_secret, Duration::hours(72)),
        Arc::clone(&sessions),
        OnboardingSettings::new(format!("{BASE_URL}/"), Duration::days(7)),
    )
    .with_clock(clock.clone());

    Fixture {
        store,
        clock,
        outbox,
        sessions,
        occupancy,
        service,
        landlord,
        property,
        unit,
    }
}

pub(super) fn contact() -> ContactDetails {
    ContactDetails {
        first_name: "Noor".to_string(),
        last_name: "Haddad".to_string(),
        email: "Noor.Haddad@example.com".to_string(),
        phone: Some("555-0142".to_string()),
    }
}

pub(super) fn lease() -> LeaseTerms {
    LeaseTerms {
        lease_start: NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date"),
        lease_end: NaiveDate::from_ymd_opt(2026, 6, 30),
        rent_amount: 132_500,
        security_deposit: 132_500,
    }
}

impl Fixture {
    pub fn invitation_input(&self) -> NewInvitation {
        NewInvitation {
            property_id: self.property.id,
            unit_id: Some(self.unit.id),
            contact: contact(),
            lease: lease(),
        }
    }

    pub fn tenant_input(&self) -> NewTenant {
        NewTenant {
            property_id: self.property.id,
            unit_id: Some(self.unit.id),
            contact: contact(),
            lease: lease(),
        }
    }

    /// Request body accepted by both the invitation and admission routes.
    pub fn tenant_json(&self) -> Value {
        json!({
            "property_id": self.property.id,
            "unit_id": self.unit.id,
            "contact": contact(),
            "lease": lease(),
        })
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn unit_status(&self) -> UnitStatus {
        self.occupancy
            .unit(self.landlord, self.unit.id)
            .expect("unit readable")
            .status
    }
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
