//! Argon2id password hashing for tenant accounts.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::workflows::WorkflowError;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn check_password_policy(password: &str) -> Result<(), WorkflowError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(WorkflowError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// PHC-format Argon2id hash with a fresh salt.
pub(crate) fn hash_password(password: &str) -> Result<String, WorkflowError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| WorkflowError::Credential(format!("hash password: {e}")))
}

pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool, WorkflowError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| WorkflowError::Credential(format!("invalid hash format: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(WorkflowError::Credential(format!("verify password: {e}"))),
    }
}
