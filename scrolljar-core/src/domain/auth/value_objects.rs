//! Authentication value objects

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static EMAIL_RX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .ok()
});

/// User ID value object, assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Email value object with validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Create a new Email with validation
    pub fn new(email: String) -> Result<Self, String> {
        let email = email.trim().to_lowercase();

        if email.is_empty() {
            return Err("must be provided".to_string());
        }

        if email.len() > 254 {
            return Err("must not be more than 254 bytes long".to_string());
        }

        match EMAIL_RX.as_ref() {
            Some(rx) if rx.is_match(&email) => Ok(Self(email)),
            _ => Err("must be a valid email address".to_string()),
        }
    }

    /// Wrap a value already validated by the store
    pub fn from_trusted(email: String) -> Self {
        Self(email)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Password hash value object (never expose raw hash)
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PasswordHash {
    fn from(hash: String) -> Self {
        Self(hash)
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// SHA-256 hex digest of an opaque bearer token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TokenHash {
    fn from(hash: String) -> Self {
        Self(hash)
    }
}

/// What a persisted token grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    Activation,
    Authorization,
    Refresh,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Activation => "activation",
            TokenScope::Authorization => "authorization",
            TokenScope::Refresh => "refresh",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "activation" => Some(TokenScope::Activation),
            "authorization" => Some(TokenScope::Authorization),
            "refresh" => Some(TokenScope::Refresh),
            _ => None,
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity bound into an upload capability: a user id, or `-1` for
/// anonymous and unactivated creators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(i64);

impl PrincipalId {
    pub const ANONYMOUS: PrincipalId = PrincipalId(-1);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 < 0
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<UserId> for PrincipalId {
    fn from(id: UserId) -> Self {
        Self(id.0)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalized() {
        let email = Email::new("  Alice@Example.COM ".to_string()).unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn test_email_rejects_garbage() {
        assert!(Email::new(String::new()).is_err());
        assert!(Email::new("no-at-sign".to_string()).is_err());
        assert!(Email::new("two@@example.com".to_string()).is_err());
    }

    #[test]
    fn test_password_hash_debug_is_redacted() {
        let hash = PasswordHash::from("$argon2id$secret".to_string());
        assert_eq!(format!("{:?}", hash), "PasswordHash(..)");
    }

    #[test]
    fn test_principal_id_anonymous() {
        assert!(PrincipalId::ANONYMOUS.is_anonymous());
        assert!(!PrincipalId::from(UserId::new(42)).is_anonymous());
        assert!(!PrincipalId::new(0).is_anonymous());
    }

    #[test]
    fn test_token_scope_parse() {
        for scope in [TokenScope::Activation, TokenScope::Authorization, TokenScope::Refresh] {
            assert_eq!(TokenScope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(TokenScope::parse("admin"), None);
    }
}
