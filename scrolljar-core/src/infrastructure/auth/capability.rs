//! Upload capability tokens
//!
//! A capability is a stateless HS256 JWT binding one future upload to one
//! scroll. It carries the scroll id, its jar id and the identity of the
//! creator, and expires a few minutes after issuance. Nothing is persisted:
//! a token is checked by signature and expiry only, and single use follows
//! from the scroll's own `Created -> Delivered` transition.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::domain::auth::PrincipalId;
use crate::domain::jar::{JarId, ScrollId};

/// Every verification failure maps to this one variant, so callers cannot
/// tell a forged token from an expired one.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("invalid upload capability")]
    Invalid,
}

#[derive(Debug, Serialize, Deserialize)]
struct CapabilityClaims {
    scroll_id: String,
    jar_id: String,
    principal_id: i64,
    iat: i64,
    exp: i64,
}

/// Verified contents of a capability token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCapability {
    pub scroll_id: ScrollId,
    pub jar_id: JarId,
    /// Creator identity; decides the upload size ceiling
    pub principal_id: PrincipalId,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies upload capabilities
#[derive(Clone)]
pub struct CapabilityTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl CapabilityTokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::minutes(5)),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.capability_secret, config.capability_ttl())
    }

    /// Mint a capability valid from now
    pub fn issue(
        &self,
        scroll_id: &ScrollId,
        jar_id: &JarId,
        principal_id: PrincipalId,
    ) -> Result<String, CapabilityError> {
        self.issue_at(scroll_id, jar_id, principal_id, Utc::now())
    }

    /// Mint a capability as if issued at `issued_at`
    pub fn issue_at(
        &self,
        scroll_id: &ScrollId,
        jar_id: &JarId,
        principal_id: PrincipalId,
        issued_at: DateTime<Utc>,
    ) -> Result<String, CapabilityError> {
        let claims = CapabilityClaims {
            scroll_id: scroll_id.to_string(),
            jar_id: jar_id.to_string(),
            principal_id: principal_id.as_i64(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode upload capability: {}", e);
            CapabilityError::Invalid
        })
    }

    /// Check signature and expiry and extract the bound ids
    pub fn verify(&self, token: &str) -> Result<UploadCapability, CapabilityError> {
        let claims = decode::<CapabilityClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Upload capability rejected: {}", e);
                CapabilityError::Invalid
            })?;

        let scroll_id = ScrollId::parse(&claims.scroll_id).ok_or(CapabilityError::Invalid)?;
        let jar_id = JarId::parse(&claims.jar_id).ok_or(CapabilityError::Invalid)?;
        let expires_at =
            DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(CapabilityError::Invalid)?;

        Ok(UploadCapability {
            scroll_id,
            jar_id,
            principal_id: PrincipalId::new(claims.principal_id),
            expires_at,
        })
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }
}
