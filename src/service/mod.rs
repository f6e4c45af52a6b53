//! Business logic layer

pub mod admission;
pub mod credential;
pub mod instance;
pub mod oauth;
pub mod respondent;

pub use admission::{Admission, AdmissionService};
pub use credential::CredentialService;
pub use instance::InstanceService;
pub use oauth::{CallbackOutcome, OAuthService};
pub use respondent::RespondentService;

use crate::error::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a respondent password using Argon2
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against its stored hash. An unparseable hash counts
/// as a failed verification, never an error surfaced to the caller.
pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hash1 = hash_password("same input").unwrap();
        let hash2 = hash_password("same input").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_garbage_hash_fails_verification() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
