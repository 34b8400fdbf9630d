use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::domain::{
    AccountId, Actor, Address, ContactDetails, LandlordId, LeaseTerms, NewProperty, NewTenant,
    NewUnit, PreferredTime, Property, PropertyType, Tenant, TimeSlot, Unit, UnitStatus, Vendor,
    VendorId,
};
use crate::notify::{EmailMessage, Notifier, NotifyError};
use crate::session::SessionKeys;
use crate::store::{InMemoryStore, VendorRepository};
use crate::workflows::dispatch::{MaintenanceDispatcher, MaintenanceRequestInput};
use crate::workflows::occupancy::OccupancyManager;

pub(super) const BASE_URL: &str = "https://app.leasekeeper.test";

/// Keeps every message handed to it; optionally refuses them all.
#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("notifier mutex").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: EmailMessage) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError::QueueUnavailable);
        }
        self.sent.lock().expect("notifier mutex").push(message);
        Ok(())
    }
}

pub(super) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub dispatcher: MaintenanceDispatcher<InMemoryStore>,
    pub landlord: Actor,
    pub property: Property,
    pub unit: Unit,
    pub tenant: Tenant,
}

pub(super) fn fixture() -> Fixture {
    fixture_with(Arc::new(RecordingNotifier::default()))
}

pub(super) fn fixture_with(notifier: Arc<RecordingNotifier>) -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::at(
        Utc.with_ymd_and_hms(2025, 5, 12, 14, 30, 0).single().expect("valid timestamp"),
    ));
    let landlord = Actor::Landlord(LandlordId::new());

    let occupancy = OccupancyManager::with_clock(Arc::clone(&store), clock.clone());
    let property = occupancy
        .create_property(
            landlord,
            NewProperty {
                name: "Riverside Flats".to_string(),
                address: Address {
                    street: "22 Water St".to_string(),
                    city: "Cedar Rapids".to_string(),
                    state: "IA".to_string(),
                    postal_code: "52401".to_string(),
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
                unit_number: "2F".to_string(),
                status: UnitStatus::Available,
                bedrooms: 1,
                bathrooms: 1.0,
                area_sqft: None,
                rent: 98_000,
            },
        )
        .expect("unit");
    let tenant = occupancy
        .create_tenant(
            landlord,
            NewTenant {
                property_id: property.id,
                unit_id: Some(unit.id),
                contact: ContactDetails {
                    first_name: "Sam".to_string(),
                    last_name: "Okafor".to_string(),
                    email: "sam@example.com".to_string(),
                    phone: None,
                },
                lease: LeaseTerms {
                    lease_start: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
                    lease_end: None,
                    rent_amount: 98_000,
                    security_deposit: 50_000,
                },
            },
        )
        .expect("tenant");

    let dispatcher = MaintenanceDispatcher::new(
        Arc::clone(&store),
        notifier.clone(),
        BASE_URL,
        Duration::days(14),
    )
    .with_clock(clock.clone());

    Fixture {
        store,
        clock,
        notifier,
        dispatcher,
        landlord,
        property,
        unit,
        tenant,
    }
}

pub(super) fn vendor(company: &str, services: &[&str], verified: bool) -> Vendor {
    Vendor {
        id: VendorId::new(),
        company_name: company.to_string(),
        email: format!(
            "dispatch@{}.example.com",
            company.to_ascii_lowercase().replace(' ', "-")
        ),
        services: services.iter().map(|service| service.to_string()).collect(),
        is_verified: verified,
        rating: 45,
    }
}

impl Fixture {
    pub fn seed(&self, vendor: Vendor) -> Vendor {
        self.store.insert_vendor(vendor).expect("vendor seeded")
    }

    pub fn input(&self, service_type: &str) -> MaintenanceRequestInput {
        MaintenanceRequestInput {
            description: Some("Kitchen sink drains slowly".to_string()),
            property_id: Some(self.property.id),
            unit_id: Some(self.unit.id),
            preferred_times: Some(vec![PreferredTime {
                day: NaiveDate::from_ymd_opt(2025, 5, 14).expect("valid date"),
                slot: TimeSlot::Morning,
            }]),
            service_type: Some(service_type.to_string()),
            tenant_id: Some(self.tenant.id),
        }
    }
}

pub(super) fn session_keys() -> Arc<SessionKeys> {
    Arc::new(SessionKeys::new(
        Some("dispatch-test-secret".to_string()),
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
