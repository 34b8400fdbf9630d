//! Maintenance vendor dispatch and confirmation links.

pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use router::dispatch_router;
pub use service::{MaintenanceDispatcher, MaintenanceDraft, MaintenanceRequestInput};
