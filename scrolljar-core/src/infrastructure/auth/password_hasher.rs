//! Password hashing service using Argon2id
//!
//! Used for account passwords and jar passwords alike.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash as Argon2Hash, PasswordHasher as Argon2Hasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};

use crate::domain::auth::{AuthError, PasswordHash};

/// Password hashing service using Argon2id
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// 19 MiB, the OWASP minimum for Argon2id
    const MEMORY_COST: u32 = 19_456;
    const TIME_COST: u32 = 2;
    const PARALLELISM: u32 = 1;
    const OUTPUT_LEN: usize = 32;

    pub fn new() -> Self {
        Self::with_params(Self::MEMORY_COST, Self::TIME_COST, Self::PARALLELISM)
    }

    /// Custom cost parameters, falling back to the library defaults when out of range
    pub fn with_params(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        let params = Params::new(memory_cost, time_cost, parallelism, Some(Self::OUTPUT_LEN))
            .unwrap_or_else(|e| {
                tracing::warn!("Invalid Argon2 parameters, using defaults: {}", e);
                Params::DEFAULT
            });

        Self { params }
    }

    /// Hash a password on the blocking pool
    pub async fn hash(&self, password: String) -> Result<PasswordHash, AuthError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
        })
        .await
        .map_err(|e| {
            tracing::error!("Password hash task panicked: {}", e);
            AuthError::HashingFailed
        })?
        .map(PasswordHash::from)
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            AuthError::HashingFailed
        })
    }

    /// Verify a password on the blocking pool
    pub async fn verify(&self, password: String, hash: PasswordHash) -> Result<bool, AuthError> {
        tokio::task::spawn_blocking(move || {
            let parsed_hash = Argon2Hash::new(hash.as_str()).map_err(|e| {
                tracing::error!("Failed to parse password hash: {}", e);
                AuthError::MalformedHash
            })?;

            // Parameters are read back from the PHC string
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok())
        })
        .await
        .map_err(|e| {
            tracing::error!("Password verify task panicked: {}", e);
            AuthError::HashingFailed
        })?
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::with_params(4096, 1, 1)
    }

    #[tokio::test]
    async fn test_password_hashing_and_verification() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct horse".to_string()).await.unwrap();

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(
            hasher
                .verify("correct horse".to_string(), hash.clone())
                .await
                .unwrap()
        );
        assert!(!hasher.verify("battery staple".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let hasher = fast_hasher();
        let first = hasher.hash("same".to_string()).await.unwrap();
        let second = hasher.hash("same".to_string()).await.unwrap();
        assert_ne!(first.as_str(), second.as_str());
    }

    #[tokio::test]
    async fn test_malformed_hash() {
        let result = fast_hasher()
            .verify("pw".to_string(), PasswordHash::from("not-a-phc".to_string()))
            .await;
        assert_eq!(result, Err(AuthError::MalformedHash));
    }
}
