//! Configuration validation module

use crate::config::{
    AuthConfig, DatabaseBackend, DatabaseConfig, JarsConfig, LoggingConfig, MailerBackend,
    MailerConfig, RateLimitConfig, ServerConfig, StorageBackend, StorageConfig, UploadConfig,
};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Rate limit configuration error: {message}")]
    RateLimit { message: String },

    #[error("Database configuration error: {message}")]
    Database { message: String },

    #[error("Authentication configuration error: {message}")]
    Auth { message: String },

    #[error("Upload configuration error: {message}")]
    Upload { message: String },

    #[error("Storage configuration error: {message}")]
    Storage { message: String },

    #[error("Mailer configuration error: {message}")]
    Mailer { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn mailer(message: impl Into<String>) -> Self {
        Self::Mailer {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // u16 cannot exceed 65535, so only zero needs rejecting
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::server(
                "Request timeout must be greater than 0 seconds",
            ));
        }

        if self.max_json_body_bytes == 0 {
            return Err(ValidationError::server(
                "Max JSON body size must be greater than 0 bytes",
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::server(format!(
                "Base URL must start with http:// or https://, got {}",
                self.base_url
            )));
        }

        if let Some(proxy) = self.trusted_proxies.iter().find(|ip| ip.is_unspecified()) {
            return Err(ValidationError::server(format!(
                "Trusted proxy must be a concrete address, got {}",
                proxy
            )));
        }

        Ok(())
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }

        if self.global_rate.is_nan() || self.global_rate <= 0.0 || self.global_burst == 0 {
            return Err(ValidationError::rate_limit(
                "Global rate and burst must be greater than 0",
            ));
        }

        if self.client_rate.is_nan() || self.client_rate <= 0.0 || self.client_burst == 0 {
            return Err(ValidationError::rate_limit(
                "Per-client rate and burst must be greater than 0",
            ));
        }

        if self.medium_divisor == 0 || self.strict_divisor == 0 {
            return Err(ValidationError::rate_limit("Tier divisors must be at least 1"));
        }

        if self.sweep_interval_seconds == 0 {
            return Err(ValidationError::rate_limit(
                "Sweep interval must be greater than 0 seconds",
            ));
        }

        if self.idle_eviction_seconds == 0 {
            return Err(ValidationError::rate_limit(
                "Idle eviction window must be greater than 0 seconds",
            ));
        }

        Ok(())
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.store_timeout_ms == 0 {
            return Err(ValidationError::database(
                "Store timeout must be greater than 0 ms",
            ));
        }

        if self.backend == DatabaseBackend::Memory {
            return Ok(());
        }

        if self.url.is_empty() {
            return Err(ValidationError::database("Database URL cannot be empty"));
        }

        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::database(
                "Database URL must start with postgres:// or postgresql://",
            ));
        }

        if self.max_connections == 0 {
            return Err(ValidationError::database(
                "Max connections must be greater than 0",
            ));
        }

        if let Some(min_idle) = self.min_idle
            && min_idle > self.max_connections
        {
            return Err(ValidationError::database(format!(
                "Min idle connections ({}) cannot exceed max connections ({})",
                min_idle, self.max_connections
            )));
        }

        Ok(())
    }
}

impl Validate for AuthConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.capability_secret.len() < 32 {
            return Err(ValidationError::auth(
                "Capability secret must be at least 32 characters long",
            ));
        }

        if self.capability_ttl_seconds == 0 {
            return Err(ValidationError::auth(
                "Capability token lifetime must be greater than 0 seconds",
            ));
        }

        if self.activation_token_ttl_seconds == 0
            || self.authorization_token_ttl_hours == 0
            || self.refresh_token_ttl_days == 0
        {
            return Err(ValidationError::auth(
                "Token lifetimes must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for UploadConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.anonymous_max_bytes == 0 {
            return Err(ValidationError::upload(
                "Anonymous upload ceiling must be greater than 0 bytes",
            ));
        }

        if self.anonymous_max_bytes >= self.authenticated_max_bytes {
            return Err(ValidationError::upload(format!(
                "Anonymous upload ceiling ({}) must be below the authenticated ceiling ({})",
                self.anonymous_max_bytes, self.authenticated_max_bytes
            )));
        }

        if self.fetch_url_ttl_seconds == 0 {
            return Err(ValidationError::upload(
                "Fetch URL lifetime must be greater than 0 seconds",
            ));
        }

        Ok(())
    }
}

impl Validate for JarsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.anonymous_expiry_days == 0 {
            return Err(ValidationError::server(
                "Anonymous jar expiry must be greater than 0 days",
            ));
        }

        if self.max_scrolls_per_request == 0 {
            return Err(ValidationError::server(
                "Max scrolls per request must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.backend == StorageBackend::Memory {
            return Ok(());
        }

        if self.bucket.is_empty() {
            return Err(ValidationError::storage("Bucket name cannot be empty"));
        }

        if self.region.is_empty() {
            return Err(ValidationError::storage("Region cannot be empty"));
        }

        if let Some(endpoint) = &self.endpoint
            && !endpoint.starts_with("http://")
            && !endpoint.starts_with("https://")
        {
            return Err(ValidationError::storage(format!(
                "Endpoint must start with http:// or https://, got {}",
                endpoint
            )));
        }

        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ValidationError::storage(
                "Static credentials require both access_key_id and secret_access_key",
            ));
        }

        Ok(())
    }
}

impl Validate for MailerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::mailer(
                "Delivery attempts must be greater than 0",
            ));
        }

        if self.backend == MailerBackend::Http {
            match &self.relay_url {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
                Some(url) => {
                    return Err(ValidationError::mailer(format!(
                        "Relay URL must start with http:// or https://, got {}",
                        url
                    )));
                }
                None => {
                    return Err(ValidationError::mailer(
                        "Relay URL is required for the http mailer",
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match self.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(ValidationError::logging(format!(
                "Log format must be json or pretty, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_port_rejected() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Server { .. })
        ));
    }

    #[test]
    fn test_unspecified_trusted_proxy_rejected() {
        let config = ServerConfig {
            trusted_proxies: vec!["10.0.0.2".parse().unwrap(), "0.0.0.0".parse().unwrap()],
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Server { .. })
        ));
    }

    #[test]
    fn test_zero_divisor_rejected() {
        let config = RateLimitConfig {
            strict_divisor: 0,
            ..RateLimitConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::RateLimit { .. })
        ));
    }

    #[test]
    fn test_disabled_rate_limit_skips_checks() {
        let config = RateLimitConfig {
            enabled: false,
            global_rate: 0.0,
            ..RateLimitConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_capability_secret_rejected() {
        let config = AuthConfig {
            capability_secret: "too-short".to_string(),
            ..AuthConfig::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::Auth { .. })));
    }

    #[test]
    fn test_upload_ceilings_must_be_ordered() {
        let config = UploadConfig {
            anonymous_max_bytes: 10 * 1024 * 1024,
            authenticated_max_bytes: 1024 * 1024,
            ..UploadConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Upload { .. })
        ));
    }

    #[test]
    fn test_memory_database_skips_url_checks() {
        let config = DatabaseConfig {
            backend: DatabaseBackend::Memory,
            url: String::new(),
            ..DatabaseConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_database_url_rejected() {
        let config = DatabaseConfig {
            url: "mysql://localhost/scrolljar".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Database { .. })
        ));
    }

    #[test]
    fn test_http_mailer_requires_relay() {
        let config = MailerConfig {
            backend: MailerBackend::Http,
            relay_url: None,
            ..MailerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Mailer { .. })
        ));
    }

    #[test]
    fn test_partial_static_credentials_rejected() {
        let config = StorageConfig {
            access_key_id: Some("AKIA".to_string()),
            ..StorageConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Storage { .. })
        ));
    }
}
