//! Plain-text bodies for workflow emails.

use chrono::{DateTime, Utc};

use super::EmailMessage;
use crate::domain::{MaintenanceRequest, Property, Tenant, Unit, Vendor};

pub fn maintenance_dispatch(
    vendor: &Vendor,
    request: &MaintenanceRequest,
    property: &Property,
    confirmation_link: &str,
) -> EmailMessage {
    let windows = if request.preferred_times.is_empty() {
        "  - no preference given".to_string()
    } else {
        request
            .preferred_times
            .iter()
            .map(|time| format!("  - {time}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let body = format!(
        "Hello {company},\n\n\
         A new {service} request has been assigned to you.\n\n\
         Property: {property_name}, {street}, {city}\n\
         Description: {description}\n\n\
         Preferred times:\n{windows}\n\n\
         Review and confirm the appointment at the link below:\n{link}\n\n\
         This link expires on {expires}.\n",
        company = vendor.company_name,
        service = request.service_type,
        property_name = property.name,
        street = property.address.street,
        city = property.address.city,
        description = request.description,
        link = confirmation_link,
        expires = request.confirmation_expires_at.format("%Y-%m-%d %H:%M UTC"),
    );

    EmailMessage {
        to: vendor.email.clone(),
        to_name: Some(vendor.company_name.clone()),
        subject: format!("New maintenance request: {}", request.service_type),
        body,
    }
}

pub fn tenant_signup(
    tenant: &Tenant,
    property: &Property,
    unit: Option<&Unit>,
    signup_link: &str,
    link_expires_at: DateTime<Utc>,
) -> EmailMessage {
    let residence = match unit {
        Some(unit) => format!("unit {} at {}", unit.unit_number, property.name),
        None => property.name.clone(),
    };

    let body = format!(
        "Hello {first_name},\n\n\
         You have been added as a tenant of {residence}.\n\
         Lease start: {lease_start}\n\n\
         Create your account here:\n{link}\n\n\
         The link expires on {expires}.\n",
        first_name = tenant.contact.first_name,
        lease_start = tenant.lease.lease_start,
        link = signup_link,
        expires = link_expires_at.format("%Y-%m-%d %H:%M UTC"),
    );

    EmailMessage {
        to: tenant.contact.email.clone(),
        to_name: Some(tenant.contact.full_name()),
        subject: format!("Set up your tenant account for {}", property.name),
        body,
    }
}
