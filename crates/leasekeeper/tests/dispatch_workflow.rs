use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate};
use leasekeeper::domain::{
    Actor, Address, ContactDetails, LandlordId, LeaseTerms, MaintenanceStatus, NewProperty,
    NewTenant, NewUnit, PreferredTime, PropertyType, Tenant, TimeSlot, UnitStatus, Vendor,
    VendorId,
};
use leasekeeper::notify::{EmailMessage, MailTransport, NotifyError, OutboundQueue};
use leasekeeper::store::{InMemoryStore, MaintenanceRepository, VendorRepository};
use leasekeeper::workflows::dispatch::{MaintenanceDispatcher, MaintenanceRequestInput};
use leasekeeper::workflows::occupancy::OccupancyManager;
use leasekeeper::workflows::WorkflowError;

/// Accepts everything and remembers it.
#[derive(Default)]
struct CapturingTransport {
    delivered: Mutex<Vec<EmailMessage>>,
}

impl MailTransport for CapturingTransport {
    fn deliver(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.delivered
            .lock()
            .map_err(|_| NotifyError::Transport("poisoned".to_string()))?
            .push(message.clone());
        Ok(())
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    outbox: Arc<OutboundQueue>,
    dispatcher: MaintenanceDispatcher<InMemoryStore>,
    landlord: Actor,
    tenant: Tenant,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let outbox = Arc::new(OutboundQueue::new(3));
    let occupancy = OccupancyManager::new(Arc::clone(&store));
    let landlord = Actor::Landlord(LandlordId::new());

    let property = occupancy
        .create_property(
            landlord,
            NewProperty {
                name: "Birch Row".to_string(),
                address: Address {
                    street: "77 Birch Row".to_string(),
                    city: "Iowa City".to_string(),
                    state: "IA".to_string(),
                    postal_code: "52240".to_string(),
                },
                property_type: PropertyType::Townhouse,
            },
        )
        .expect("property");
    let unit = occupancy
        .create_unit(
            landlord,
            NewUnit {
                property_id: property.id,
                unit_number: "B".to_string(),
                status: UnitStatus::Available,
                bedrooms: 3,
                bathrooms: 2.0,
                area_sqft: Some(1_400),
                rent: 175_000,
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
                    first_name: "Mika".to_string(),
                    last_name: "Tanaka".to_string(),
                    email: "mika@example.com".to_string(),
                    phone: None,
                },
                lease: LeaseTerms {
                    lease_start: NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid date"),
                    lease_end: None,
                    rent_amount: 175_000,
                    security_deposit: 0,
                },
            },
        )
        .expect("tenant");

    let dispatcher = MaintenanceDispatcher::new(
        Arc::clone(&store),
        outbox.clone(),
        "https://portal.example.com",
        Duration::days(14),
    );

    Harness {
        store,
        outbox,
        dispatcher,
        landlord,
        tenant,
    }
}

fn vendor(company: &str, services: &[&str], verified: bool) -> Vendor {
    Vendor {
        id: VendorId::new(),
        company_name: company.to_string(),
        email: format!("jobs@{}.example.com", company.to_ascii_lowercase().replace(' ', "")),
        services: services.iter().map(|service| service.to_string()).collect(),
        is_verified: verified,
        rating: 40,
    }
}

fn request_input(tenant: &Tenant, service_type: &str) -> MaintenanceRequestInput {
    MaintenanceRequestInput {
        description: Some("Water pooling under the dishwasher".to_string()),
        property_id: Some(tenant.property_id),
        unit_id: tenant.unit_id,
        preferred_times: Some(vec![PreferredTime {
            day: NaiveDate::from_ymd_opt(2025, 9, 3).expect("valid date"),
            slot: TimeSlot::Evening,
        }]),
        service_type: Some(service_type.to_string()),
        tenant_id: Some(tenant.id),
    }
}

#[test]
fn plumbing_request_reaches_the_single_verified_plumber() {
    let h = harness();
    h.store
        .insert_vendor(vendor("Volt Bros", &["ELECTRICAL"], true))
        .expect("seed");
    h.store
        .insert_vendor(vendor("Pipe Dream", &["PLUMBING"], false))
        .expect("seed");
    let plumber = h
        .store
        .insert_vendor(vendor("Drain Kings", &["PLUMBING"], true))
        .expect("seed");

    let request = h
        .dispatcher
        .create_request(Actor::Tenant(h.tenant.id), request_input(&h.tenant, "PLUMBING"))
        .expect("dispatched");
    assert_eq!(request.vendor_id, plumber.id);
    assert_eq!(request.status, MaintenanceStatus::Pending);
    assert!(!request.confirmation_token.is_empty());

    let transport = CapturingTransport::default();
    let report = h.outbox.flush(&transport);
    assert_eq!(report.delivered, 1);
    let delivered = transport.delivered.lock().expect("lock").clone();
    assert_eq!(delivered[0].to, plumber.email);
    assert!(delivered[0].body.contains(&request.confirmation_token));
    assert!(h.outbox.is_empty());
}

#[test]
fn no_matching_vendor_writes_nothing() {
    let h = harness();
    h.store
        .insert_vendor(vendor("Cool Breeze", &["HVAC"], false))
        .expect("seed");

    assert!(matches!(
        h.dispatcher.assign_vendor("HVAC"),
        Err(WorkflowError::NoVendorAvailable)
    ));
    let result = h
        .dispatcher
        .create_request(h.landlord, request_input(&h.tenant, "HVAC"));
    assert!(matches!(result, Err(WorkflowError::NoVendorAvailable)));
    assert!(h.outbox.is_empty());
}

#[test]
fn vendor_confirms_once_through_the_emailed_token() {
    let h = harness();
    h.store
        .insert_vendor(vendor("Cool Breeze", &["HVAC"], true))
        .expect("seed");
    let request = h
        .dispatcher
        .create_request(h.landlord, request_input(&h.tenant, "hvac"))
        .expect("dispatched");

    let confirmed = h
        .dispatcher
        .confirm(&request.confirmation_token)
        .expect("confirmed");
    assert_eq!(confirmed.status, MaintenanceStatus::Confirmed);
    assert!(confirmed.confirmed_at.is_some());
    assert!(matches!(
        h.dispatcher.confirm(&request.confirmation_token),
        Err(WorkflowError::InvalidOrExpiredToken)
    ));

    let stored = h
        .store
        .fetch_request(request.id)
        .expect("read")
        .expect("persisted");
    assert_eq!(stored.status, MaintenanceStatus::Confirmed);
}
