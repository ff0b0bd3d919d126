//! Argon2id password hashing with a server-side pepper.

use super::errors::{AuthError, AuthResult};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hashes and verifies passwords off the async executor
#[derive(Clone)]
pub struct PepperedHasher {
    pepper: String,
}

impl PepperedHasher {
    pub fn new(pepper: String) -> Self {
        Self { pepper }
    }

    /// Hash a password into a PHC string
    pub async fn hash(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(peppered.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|_| AuthError::HashingFailed)
        })
        .await
        .map_err(|_| AuthError::HashingFailed)?
    }

    /// Verify a password against a stored PHC string
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Mismatch or unparsable hash
    pub async fn verify(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash).map_err(|_| AuthError::InvalidCredentials)?;
            Argon2::default()
                .verify_password(peppered.as_bytes(), &parsed)
                .map_err(|_| AuthError::InvalidCredentials)
        })
        .await
        .map_err(|_| AuthError::HashingFailed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hasher = PepperedHasher::new("pepper-for-tests".to_string());
        let hash = hasher.hash("secret1").await.unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("secret1", &hash).await.is_ok());
        assert!(matches!(
            hasher.verify("secret2", &hash).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_pepper_is_part_of_the_hash() {
        let hash = PepperedHasher::new("pepper-a".to_string())
            .hash("secret1")
            .await
            .unwrap();

        let other = PepperedHasher::new("pepper-b".to_string());
        assert!(other.verify("secret1", &hash).await.is_err());
    }
}
