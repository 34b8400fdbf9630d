//! Property occupancy, maintenance dispatch, and tenant onboarding workflows.

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod tokens;
pub mod workflows;
