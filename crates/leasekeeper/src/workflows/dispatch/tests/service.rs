use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::domain::{Actor, LandlordId, MaintenanceStatus, TenantId};
use crate::store::{MaintenanceRepository, StoreOp};
use crate::workflows::dispatch::{MaintenanceDraft, MaintenanceRequestInput};
use crate::workflows::WorkflowError;

#[test]
fn plumbing_request_goes_to_the_only_plumber() {
    let fx = fixture();
    fx.seed(vendor("Spark Electric", &["ELECTRICAL"], true));
    let plumber = fx.seed(vendor("Flow Masters", &["PLUMBING", "HVAC"], true));

    let request = fx
        .dispatcher
        .create_request(fx.landlord, fx.input("PLUMBING"))
        .expect("request dispatched");

    assert_eq!(request.vendor_id, plumber.id);
    assert_eq!(request.status, MaintenanceStatus::Pending);
    assert!(!request.confirmation_token.is_empty());
    assert_eq!(
        request.confirmation_expires_at,
        request.created_at + Duration::days(14)
    );

    let stored = fx
        .store
        .fetch_request(request.id)
        .expect("read")
        .expect("persisted");
    assert_eq!(stored, request);
}

#[test]
fn vendor_email_carries_the_confirmation_link() {
    let fx = fixture();
    let plumber = fx.seed(vendor("Flow Masters", &["PLUMBING"], true));

    let request = fx
        .dispatcher
        .create_request(fx.landlord, fx.input("plumbing"))
        .expect("request dispatched");

    let messages = fx.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].to, plumber.email);
    assert!(messages[0].body.contains("Kitchen sink drains slowly"));
    assert!(messages[0].body.contains(&format!(
        "{BASE_URL}/api/v1/maintenance/confirm?token={}",
        request.confirmation_token
    )));
}

#[test]
fn unverified_vendors_are_never_assigned() {
    let fx = fixture();
    fx.seed(vendor("Cheap Pipes", &["PLUMBING"], false));
    fx.seed(vendor("Cool Air", &["HVAC"], true));

    let result = fx
        .dispatcher
        .create_request(fx.landlord, fx.input("PLUMBING"));
    assert!(matches!(result, Err(WorkflowError::NoVendorAvailable)));
    assert!(fx.notifier.messages().is_empty());
}

#[test]
fn assign_vendor_matches_only_verified_offerings_in_store_order() {
    let fx = fixture();
    fx.seed(vendor("Unlisted Air", &["HVAC"], false));
    let first = fx.seed(vendor("Cool Air", &[" hvac "], true));
    fx.seed(vendor("Second Air", &["HVAC"], true));

    let chosen = fx.dispatcher.assign_vendor("HVAC").expect("vendor found");
    assert_eq!(chosen.id, first.id);
    assert!(chosen.is_verified && chosen.offers("HVAC"));

    assert!(matches!(
        fx.dispatcher.assign_vendor("ROOFING"),
        Err(WorkflowError::NoVendorAvailable)
    ));
}

#[test]
fn missing_fields_are_rejected_before_vendor_lookup() {
    let fx = fixture();
    fx.seed(vendor("Flow Masters", &["PLUMBING"], true));

    let mut no_times = fx.input("PLUMBING");
    no_times.preferred_times = Some(Vec::new());
    let mut blank_description = fx.input("PLUMBING");
    blank_description.description = Some("   ".to_string());

    for input in [
        MaintenanceRequestInput::default(),
        no_times,
        blank_description,
    ] {
        let err = fx
            .dispatcher
            .create_request(fx.landlord, input)
            .expect_err("validation fails");
        assert_eq!(err.to_string(), "Missing required fields");
    }
    assert!(fx.notifier.messages().is_empty());
}

#[test]
fn draft_keeps_optional_unit() {
    let fx = fixture();
    let mut input = fx.input("PLUMBING");
    input.unit_id = None;

    let draft = MaintenanceDraft::try_from(input).expect("draft");
    assert_eq!(draft.unit_id, None);
    assert_eq!(draft.service_type, "PLUMBING");
}

#[test]
fn notifier_failure_does_not_undo_the_request() {
    let fx = fixture_with(Arc::new(RecordingNotifier::failing()));
    fx.seed(vendor("Flow Masters", &["PLUMBING"], true));

    let request = fx
        .dispatcher
        .create_request(fx.landlord, fx.input("PLUMBING"))
        .expect("request still created");
    assert!(fx
        .store
        .fetch_request(request.id)
        .expect("read")
        .is_some());
}

#[test]
fn persistence_failure_surfaces_and_sends_nothing() {
    let fx = fixture();
    fx.seed(vendor("Flow Masters", &["PLUMBING"], true));
    fx.store.inject_fault(StoreOp::InsertRequest);

    let result = fx
        .dispatcher
        .create_request(fx.landlord, fx.input("PLUMBING"));
    assert!(matches!(result, Err(WorkflowError::Persistence(_))));
    assert!(fx.notifier.messages().is_empty());
}

#[test]
fn tenants_may_only_request_for_themselves() {
    let fx = fixture();
    fx.seed(vendor("Flow Masters", &["PLUMBING"], true));

    let own = fx
        .dispatcher
        .create_request(Actor::Tenant(fx.tenant.id), fx.input("PLUMBING"))
        .expect("tenant files own request");
    assert_eq!(own.tenant_id, fx.tenant.id);

    let stranger = fx
        .dispatcher
        .create_request(Actor::Tenant(TenantId::new()), fx.input("PLUMBING"));
    assert!(matches!(stranger, Err(WorkflowError::NotFound("tenant"))));

    let other_landlord = fx
        .dispatcher
        .create_request(Actor::Landlord(LandlordId::new()), fx.input("PLUMBING"));
    assert!(matches!(other_landlord, Err(WorkflowError::NotFound("tenant"))));
}

#[test]
fn confirmation_token_is_single_use() {
    let fx = fixture();
    fx.seed(vendor("Flow Masters", &["PLUMBING"], true));
    let request = fx
        .dispatcher
        .create_request(fx.landlord, fx.input("PLUMBING"))
        .expect("request");

    fx.clock.advance(Duration::hours(3));
    let confirmed = fx
        .dispatcher
        .confirm(&request.confirmation_token)
        .expect("first confirmation");
    assert_eq!(confirmed.status, MaintenanceStatus::Confirmed);
    assert_eq!(confirmed.confirmed_at, Some(request.created_at + Duration::hours(3)));

    assert!(matches!(
        fx.dispatcher.confirm(&request.confirmation_token),
        Err(WorkflowError::InvalidOrExpiredToken)
    ));
    assert!(matches!(
        fx.dispatcher.confirm("not-a-token"),
        Err(WorkflowError::InvalidOrExpiredToken)
    ));
}

#[test]
fn previewing_a_confirmation_leaves_it_pending() {
    let fx = fixture();
    fx.seed(vendor("Flow Masters", &["PLUMBING"], true));
    let request = fx
        .dispatcher
        .create_request(fx.landlord, fx.input("PLUMBING"))
        .expect("request");

    for _ in 0..3 {
        let seen = fx
            .dispatcher
            .pending_confirmation(&request.confirmation_token)
            .expect("preview");
        assert_eq!(seen.id, request.id);
        assert_eq!(seen.status, MaintenanceStatus::Pending);
    }
    let stored = fx
        .store
        .fetch_request(request.id)
        .expect("read")
        .expect("persisted");
    assert_eq!(stored.status, MaintenanceStatus::Pending);
    assert!(stored.confirmed_at.is_none());

    fx.dispatcher
        .confirm(&request.confirmation_token)
        .expect("confirmed");
    assert!(matches!(
        fx.dispatcher.pending_confirmation(&request.confirmation_token),
        Err(WorkflowError::InvalidOrExpiredToken)
    ));
}

#[test]
fn confirmation_token_expires() {
    let fx = fixture();
    fx.seed(vendor("Flow Masters", &["PLUMBING"], true));
    let request = fx
        .dispatcher
        .create_request(fx.landlord, fx.input("PLUMBING"))
        .expect("request");

    fx.clock.advance(Duration::days(14));
    assert!(matches!(
        fx.dispatcher.confirm(&request.confirmation_token),
        Err(WorkflowError::InvalidOrExpiredToken)
    ));
    let stored = fx
        .store
        .fetch_request(request.id)
        .expect("read")
        .expect("persisted");
    assert_eq!(stored.status, MaintenanceStatus::Pending);
}

#[test]
fn requests_are_visible_only_in_scope() {
    let fx = fixture();
    fx.seed(vendor("Flow Masters", &["PLUMBING"], true));
    let request = fx
        .dispatcher
        .create_request(fx.landlord, fx.input("PLUMBING"))
        .expect("request");

    assert!(fx.dispatcher.request(fx.landlord, request.id).is_ok());
    assert!(fx
        .dispatcher
        .request(Actor::Tenant(fx.tenant.id), request.id)
        .is_ok());
    assert!(matches!(
        fx.dispatcher
            .request(Actor::Landlord(LandlordId::new()), request.id),
        Err(WorkflowError::NotFound(_))
    ));
}
