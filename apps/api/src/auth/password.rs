//! Password hashing and verification.
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

use super::AuthError;

/// Upper bound on accepted plaintext length, in characters.
pub const DEFAULT_MAX_PASSWORD_LENGTH: usize = 200;

/// Hashes and checks passwords as argon2 PHC strings
/// (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`), so every digest
/// carries its own salt and cost parameters.
#[derive(Debug, Clone)]
pub struct CredentialManager {
    max_length: usize,
}

impl Default for CredentialManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PASSWORD_LENGTH)
    }
}

impl CredentialManager {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Hash a password with a fresh random salt.
    pub fn hash_password(&self, plain: &str) -> Result<String, AuthError> {
        if plain.is_empty() {
            return Err(AuthError::InvalidInput("Password is required.".to_string()));
        }
        if plain.chars().count() > self.max_length {
            return Err(AuthError::InvalidInput(format!(
                "Password must be at most {} characters.",
                self.max_length
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let digest = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(digest.to_string())
    }

    /// Verify a password against a stored digest. A digest that does not
    /// parse never verifies.
    pub fn verify_password(&self, plain: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("Stored password digest is malformed: {e}");
                return false;
            }
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2_phc() {
        let digest = CredentialManager::default().hash_password("demo123").unwrap();
        assert!(digest.starts_with("$argon2"));
        assert!(!digest.contains("demo123"));
    }

    #[test]
    fn test_hash_unique_each_time() {
        let creds = CredentialManager::default();
        let h1 = creds.hash_password("same-password").unwrap();
        let h2 = creds.hash_password("same-password").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_verify_roundtrip() {
        let creds = CredentialManager::default();
        let digest = creds.hash_password("correct horse").unwrap();
        assert!(creds.verify_password("correct horse", &digest));
    }

    #[test]
    fn test_verify_rejects_other_password() {
        let creds = CredentialManager::default();
        let digest = creds.hash_password("original").unwrap();
        assert!(!creds.verify_password("Original", &digest));
        assert!(!creds.verify_password("", &digest));
    }

    #[test]
    fn test_verify_malformed_digest_is_false() {
        let creds = CredentialManager::default();
        assert!(!creds.verify_password("anything", "not-a-digest"));
        assert!(!creds.verify_password("anything", ""));
    }

    #[test]
    fn test_empty_password_rejected() {
        let err = CredentialManager::default().hash_password("").unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
    }

    #[test]
    fn test_length_limit_counts_characters() {
        let creds = CredentialManager::new(4);
        assert!(creds.hash_password("ñüéß").is_ok());
        assert!(matches!(
            creds.hash_password("abcde"),
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unicode_password() {
        let creds = CredentialManager::default();
        let digest = creds.hash_password("密码🔐пароль").unwrap();
        assert!(creds.verify_password("密码🔐пароль", &digest));
    }
}
