use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("malformed password hash")]
    Format,
    #[error("password hashing failed")]
    Hash,
}

/// Hashes a plaintext password with a fresh random salt. The salt is
/// embedded in the PHC output string, so verification needs nothing else.
pub fn hash_password(plain: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            CredentialError::Hash
        })?
        .to_string();
    Ok(hash)
}

/// Checks a plaintext candidate against a stored hash. A mismatch is
/// `Ok(false)`; only a malformed stored hash is an error.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        CredentialError::Format
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3Passw0rd";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correcthorse42";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrongpassword1", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let hash_a = hash_password("duplicate123").expect("hash a");
        let hash_b = hash_password("duplicate123").expect("hash b");
        assert_ne!(hash_a, hash_b);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, CredentialError::Format));
    }
}
