//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Validate a password before accepting it at registration or reset
pub fn validate_password(password: &str) -> Result<(), PasswordValidationError> {
    if password.len() < 8 {
        return Err(PasswordValidationError::TooShort);
    }
    if password.len() > 128 {
        return Err(PasswordValidationError::TooLong);
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordValidationError {
    #[error("Password must be at least 8 characters")]
    TooShort,
    #[error("Password must be at most 128 characters")]
    TooLong,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "SecureP@ssw0rd123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(verify_password(password, &hash).expect("Verification failed"));
        assert!(!verify_password("wrong_password", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_password_validation() {
        assert!(matches!(
            validate_password("short"),
            Err(PasswordValidationError::TooShort)
        ));

        let long_password = "a".repeat(129);
        assert!(matches!(
            validate_password(&long_password),
            Err(PasswordValidationError::TooLong)
        ));

        assert!(validate_password("long-enough-password").is_ok());
    }
}
