//! Jar and scroll value objects

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alphabet of public jar and scroll ids
pub const BASE62_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
/// Length of public jar and scroll ids
pub const PUBLIC_ID_LEN: usize = 8;

fn random_public_id() -> String {
    let mut rng = rand::rng();
    (0..PUBLIC_ID_LEN)
        .map(|_| BASE62_ALPHABET[rng.random_range(0..BASE62_ALPHABET.len())] as char)
        .collect()
}

fn is_public_id(value: &str) -> bool {
    value.len() == PUBLIC_ID_LEN && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

macro_rules! public_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Draw a fresh random id
            pub fn generate() -> Self {
                Self(random_public_id())
            }

            /// Accept a well-formed 8-character base62 id
            pub fn parse(value: &str) -> Option<Self> {
                is_public_id(value).then(|| Self(value.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

public_id!(
    /// Public identifier of a jar
    JarId
);

public_id!(
    /// Public identifier of a scroll
    ScrollId
);

/// Who may read a jar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JarAccess {
    /// Anyone holding the id
    #[default]
    Public,
    /// Readers must present the jar password
    Private,
}

impl JarAccess {
    pub fn as_i16(&self) -> i16 {
        match self {
            JarAccess::Public => 0,
            JarAccess::Private => 1,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(JarAccess::Public),
            1 => Some(JarAccess::Private),
            _ => None,
        }
    }
}

/// Lifecycle state of a scroll's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollState {
    /// Metadata exists, content not uploaded yet
    Created,
    /// Content uploaded; terminal
    Delivered,
}

impl ScrollState {
    pub fn from_uploaded(uploaded: bool) -> Self {
        if uploaded {
            ScrollState::Delivered
        } else {
            ScrollState::Created
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, ScrollState::Delivered)
    }
}

/// Object storage key of a scroll's content: `{jar_id}/{scroll_id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn for_scroll(jar_id: &JarId, scroll_id: &ScrollId) -> Self {
        Self(format!("{}/{}", jar_id, scroll_id))
    }

    /// Split a raw key back into its ids; `None` for foreign keys
    pub fn parse(raw: &str) -> Option<(JarId, ScrollId)> {
        let (jar, scroll) = raw.split_once('/')?;
        Some((JarId::parse(jar)?, ScrollId::parse(scroll)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_base62() {
        for _ in 0..100 {
            let id = JarId::generate();
            assert_eq!(id.as_str().len(), PUBLIC_ID_LEN);
            assert!(JarId::parse(id.as_str()).is_some());
        }
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        assert!(ScrollId::parse("short").is_none());
        assert!(ScrollId::parse("abc-defg").is_none());
        assert!(ScrollId::parse("abcdefghi").is_none());
        assert!(ScrollId::parse("aB3dE6gH").is_some());
    }

    #[test]
    fn test_object_key_round_trip() {
        let jar = JarId::parse("Jar00001").unwrap();
        let scroll = ScrollId::parse("Scr00001").unwrap();
        let key = ObjectKey::for_scroll(&jar, &scroll);
        assert_eq!(key.as_str(), "Jar00001/Scr00001");
        assert_eq!(ObjectKey::parse(key.as_str()), Some((jar, scroll)));
        assert_eq!(ObjectKey::parse("backups/2024.tar"), None);
    }

    #[test]
    fn test_access_codes() {
        assert_eq!(JarAccess::from_i16(JarAccess::Private.as_i16()), Some(JarAccess::Private));
        assert_eq!(JarAccess::from_i16(7), None);
    }
}
