//! Opaque bearer token generator
//!
//! Tokens are random bytes, hex encoded for the caller. Only the SHA-256 of
//! the plaintext is stored.

use chrono::{DateTime, TimeDelta, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::domain::auth::{IssuedToken, Token, TokenHash, TokenScope, UserId};

#[derive(Clone)]
pub struct TokenGenerator {
    /// Random bytes per token before hex encoding
    byte_length: usize,
}

impl TokenGenerator {
    pub fn new() -> Self {
        Self { byte_length: 16 }
    }

    pub fn with_length(byte_length: usize) -> Self {
        Self { byte_length }
    }

    /// Generate a token for `user_id` expiring `ttl` after `now`
    pub fn generate(
        &self,
        user_id: UserId,
        scope: TokenScope,
        ttl: TimeDelta,
        now: DateTime<Utc>,
    ) -> IssuedToken {
        let mut random_bytes = vec![0u8; self.byte_length];
        rand::rng().fill_bytes(&mut random_bytes);
        let plaintext = hex::encode(random_bytes);

        IssuedToken {
            token: Token {
                hash: Self::hash(&plaintext),
                user_id,
                scope,
                expires_at: now + ttl,
            },
            plaintext,
        }
    }

    pub fn hash(plaintext: &str) -> TokenHash {
        let digest = Sha256::digest(plaintext.as_bytes());
        TokenHash::from(hex::encode(digest))
    }

    /// Compare two token hashes in constant time
    pub fn constant_time_compare(provided: &TokenHash, stored: &TokenHash) -> bool {
        let provided = provided.as_str().as_bytes();
        let stored = stored.as_str().as_bytes();

        if provided.len() != stored.len() {
            return false;
        }

        provided.ct_eq(stored).into()
    }

    /// Whether `value` has the shape of a token this generator produces
    pub fn is_well_formed(&self, value: &str) -> bool {
        value.len() == self.byte_length * 2 && value.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}
