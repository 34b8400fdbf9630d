//! Unit occupancy and property unit-count bookkeeping.

mod assignment;
mod import;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use assignment::AssignmentOption;
pub use import::ImportSummary;
pub use router::occupancy_router;
pub use service::{OccupancyManager, ResyncReport};
