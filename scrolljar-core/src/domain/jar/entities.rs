//! Jar and scroll entities

use chrono::{DateTime, Utc};

use super::value_objects::{JarAccess, JarId, ObjectKey, ScrollId, ScrollState};
use crate::domain::auth::{PasswordHash, UserId};
use crate::domain::store::Version;

/// Collection of scrolls sharing access and expiry policy
#[derive(Debug, Clone)]
pub struct Jar {
    pub id: JarId,
    /// `None` for jars created anonymously
    pub owner: Option<UserId>,
    pub name: String,
    pub access: JarAccess,
    pub password_hash: Option<PasswordHash>,
    pub tags: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub version: Version,
}

impl Jar {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether `user` created this jar. Anonymous jars have no owner.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner.as_ref() == Some(user)
    }

    pub fn requires_password(&self) -> bool {
        self.access == JarAccess::Private
    }
}

/// Jar fields supplied on creation
#[derive(Debug, Clone)]
pub struct NewJar {
    pub owner: Option<UserId>,
    pub name: String,
    pub access: JarAccess,
    pub password_hash: Option<PasswordHash>,
    pub tags: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One text snippet belonging to a jar
#[derive(Debug, Clone)]
pub struct Scroll {
    pub id: ScrollId,
    pub jar_id: JarId,
    pub title: Option<String>,
    pub format: Option<String>,
    pub state: ScrollState,
    pub created_at: DateTime<Utc>,
    pub version: Version,
}

impl Scroll {
    pub fn object_key(&self) -> ObjectKey {
        ObjectKey::for_scroll(&self.jar_id, &self.id)
    }
}

/// Scroll fields supplied on creation
#[derive(Debug, Clone)]
pub struct NewScroll {
    pub jar_id: JarId,
    pub title: Option<String>,
    pub format: Option<String>,
}

/// Editable scroll metadata
#[derive(Debug, Clone, Default)]
pub struct ScrollUpdate {
    pub title: Option<String>,
    pub format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn jar(owner: Option<UserId>, expires_at: Option<DateTime<Utc>>) -> Jar {
        let now = Utc::now();
        Jar {
            id: JarId::generate(),
            owner,
            name: "notes".to_string(),
            access: JarAccess::Public,
            password_hash: None,
            tags: vec![],
            expires_at,
            created_at: now,
            version: Version::initial(now),
        }
    }

    #[test]
    fn test_jar_expiry() {
        let now = Utc::now();
        assert!(!jar(None, None).is_expired(now));
        assert!(!jar(None, Some(now + TimeDelta::hours(1))).is_expired(now));
        assert!(jar(None, Some(now - TimeDelta::seconds(1))).is_expired(now));
    }

    #[test]
    fn test_anonymous_jar_has_no_owner() {
        let anonymous = jar(None, None);
        assert!(!anonymous.is_owned_by(&UserId::new(1)));

        let owned = jar(Some(UserId::new(1)), None);
        assert!(owned.is_owned_by(&UserId::new(1)));
        assert!(!owned.is_owned_by(&UserId::new(2)));
    }
}
