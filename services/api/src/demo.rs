use crate::infra::{local_config, seed_vendors, Services};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use leasekeeper::domain::{
    Actor, Address, ContactDetails, LandlordId, LeaseTerms, NewInvitation, NewProperty,
    NewTenant, PreferredTime, PropertyType, TenantPatch, TenantStatus, TimeSlot,
};
use leasekeeper::error::AppError;
use leasekeeper::notify::{EmailMessage, LogMailer, MailTransport, NotifyError};
use leasekeeper::workflows::dispatch::MaintenanceRequestInput;
use leasekeeper::workflows::occupancy::AssignmentOption;
use leasekeeper::workflows::WorkflowError;
use std::io::Cursor;

const DEMO_ROSTER: &str = "unit_number,bedrooms,bathrooms,area_sqft,rent\n\
1A,1,1,620,98000\n\
1B,2,1,810,121000\n\
2A,2,2,940,134500\n";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Service type for the sample maintenance request (defaults to PLUMBING)
    #[arg(long)]
    pub(crate) service_type: Option<String>,
    /// Print every queued email instead of sending it to the trace log
    #[arg(long)]
    pub(crate) show_emails: bool,
}

/// Writes messages to stdout.
struct ConsoleMailer;

impl MailTransport for ConsoleMailer {
    fn deliver(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        println!("\n--- email to {} ---", message.to);
        println!("Subject: {}", message.subject);
        println!("{}", message.body.trim_end());
        Ok(())
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        service_type,
        show_emails,
    } = args;
    let service_type = service_type.unwrap_or_else(|| "PLUMBING".to_string());

    let services = Services::build(&local_config("leasekeeper-demo-secret"));
    let vendors = seed_vendors(&services.store).map_err(WorkflowError::from)?;
    let landlord = Actor::Landlord(LandlordId::new());
    let today = Local::now().date_naive();

    println!("Leasekeeper demo");
    println!("Vendor directory: {} vendors", vendors.len());

    let property = services.occupancy.create_property(
        landlord,
        NewProperty {
            name: "Foundry Commons".to_string(),
            address: Address {
                street: "140 Foundry St".to_string(),
                city: "Dubuque".to_string(),
                state: "IA".to_string(),
                postal_code: "52001".to_string(),
            },
            property_type: PropertyType::Apartment,
        },
    )?;
    let imported =
        services
            .occupancy
            .import_units(landlord, property.id, Cursor::new(DEMO_ROSTER))?;
    println!(
        "\nProperty {} imported {} units (total_units = {})",
        property.name,
        imported.created.len(),
        imported.total_units
    );

    let [first_unit, second_unit, ..] = imported.created.as_slice() else {
        return Err(WorkflowError::Validation("demo roster produced too few units".to_string()).into());
    };
    let admitted = services.onboarding.admit_tenant(
        landlord,
        NewTenant {
            property_id: property.id,
            unit_id: Some(first_unit.id),
            contact: contact("Priya", "Shah"),
            lease: lease(today),
        },
    )?;
    let tenant = admitted.tenant;
    println!(
        "Tenant {} admitted to unit {} (status {})",
        tenant.contact.full_name(),
        first_unit.unit_number,
        services
            .occupancy
            .unit(landlord, first_unit.id)?
            .status
            .label()
    );

    println!("\nAssignment options:");
    for option in services.occupancy.assignment_options(landlord, property.id)? {
        match option {
            AssignmentOption::Unit { unit_number, .. } => println!("  - unit {unit_number}"),
            AssignmentOption::EntireProperty { label, .. } => println!("  - {label}"),
        }
    }

    let request = services.dispatcher.create_request(
        Actor::Tenant(tenant.id),
        MaintenanceRequestInput {
            description: Some("Bathroom faucet drips constantly".to_string()),
            property_id: Some(property.id),
            unit_id: tenant.unit_id,
            preferred_times: Some(vec![PreferredTime {
                day: today + Duration::days(2),
                slot: TimeSlot::Morning,
            }]),
            service_type: Some(service_type.clone()),
            tenant_id: Some(tenant.id),
        },
    )?;
    let vendor = vendors
        .iter()
        .find(|vendor| vendor.id == request.vendor_id)
        .map(|vendor| vendor.company_name.as_str())
        .unwrap_or("unknown vendor");
    println!("\n{service_type} request {} assigned to {vendor}", request.id);
    let confirmed = services.dispatcher.confirm(&request.confirmation_token)?;
    println!("Vendor confirmed: status {:?}", confirmed.status);

    let invitation = services.onboarding.create_invitation(
        landlord,
        NewInvitation {
            property_id: property.id,
            unit_id: Some(second_unit.id),
            contact: contact("Tomas", "Berg"),
            lease: lease(today),
        },
    )?;
    let redeemed = services
        .onboarding
        .redeem_invitation(&invitation.verification_token)?;
    let signup = services
        .onboarding
        .complete_signup(&redeemed.signup_token, "foundry-commons-1B")?;
    services
        .onboarding
        .sign_in(&redeemed.tenant.contact.email, "foundry-commons-1B")?;
    println!(
        "\nInvitation redeemed for unit {}; account {} signed in",
        second_unit.unit_number, signup.account_id
    );

    services.occupancy.update_tenant(
        landlord,
        tenant.id,
        TenantPatch {
            status: Some(TenantStatus::MovedOut),
            ..TenantPatch::default()
        },
    )?;
    println!(
        "Tenant {} moved out; unit {} is {}",
        tenant.contact.full_name(),
        first_unit.unit_number,
        services
            .occupancy
            .unit(landlord, first_unit.id)?
            .status
            .label()
    );

    let report = services.occupancy.resync_all()?;
    println!(
        "Resync scanned {} properties, corrected {} counts, repaired {} units",
        report.properties_scanned, report.counts_corrected, report.units_repaired
    );

    let flushed = if show_emails {
        services.outbox.flush(&ConsoleMailer)
    } else {
        services.outbox.flush(&LogMailer)
    };
    println!(
        "\nOutbox: {} delivered, {} requeued, {} dropped",
        flushed.delivered, flushed.requeued, flushed.dropped
    );

    Ok(())
}

fn contact(first_name: &str, last_name: &str) -> ContactDetails {
    ContactDetails {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!(
            "{}.{}@example.com",
            first_name.to_ascii_lowercase(),
            last_name.to_ascii_lowercase()
        ),
        phone: None,
    }
}

fn lease(start: NaiveDate) -> LeaseTerms {
    LeaseTerms {
        lease_start: start,
        lease_end: Some(start + Duration::days(365)),
        rent_amount: 121_000,
        security_deposit: 121_000,
    }
}
