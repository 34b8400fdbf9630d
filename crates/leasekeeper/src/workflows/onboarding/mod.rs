//! Tenant invitations, admission, and account completion.

mod claims;
mod credentials;
pub mod invitation;
pub mod router;
pub mod signup;

#[cfg(test)]
mod tests;

pub use claims::{IssuedSignupToken, SignupClaims, SignupTokens};
pub use invitation::{AdmittedTenant, OnboardingService, OnboardingSettings};
pub use router::onboarding_router;
pub use signup::{InvitationPreview, SignupOutcome};
