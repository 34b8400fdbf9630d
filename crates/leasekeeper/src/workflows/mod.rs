pub mod dispatch;
mod error;
pub mod occupancy;
pub mod onboarding;

pub use error::WorkflowError;
