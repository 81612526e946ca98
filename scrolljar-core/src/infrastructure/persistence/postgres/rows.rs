//! Row shapes read back by sqlx and their conversion into domain entities

use chrono::{DateTime, Utc};

use crate::domain::auth::{Email, PasswordHash, User, UserId};
use crate::domain::jar::{Jar, JarAccess, JarId, Scroll, ScrollId, ScrollState};
use crate::domain::store::{StoreError, Version};

#[derive(Debug, sqlx::FromRow)]
pub(super) struct JarRow {
    id: String,
    user_id: Option<i64>,
    name: String,
    access: i16,
    password_hash: Option<String>,
    tags: Vec<String>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JarRow> for Jar {
    type Error = StoreError;

    fn try_from(row: JarRow) -> Result<Self, Self::Error> {
        let id = JarId::parse(&row.id)
            .ok_or_else(|| StoreError::backend(format!("malformed jar id {:?}", row.id)))?;
        let access = JarAccess::from_i16(row.access)
            .ok_or_else(|| StoreError::backend(format!("unknown jar access {}", row.access)))?;

        Ok(Jar {
            id,
            owner: row.user_id.map(UserId::new),
            name: row.name,
            access,
            password_hash: row.password_hash.map(PasswordHash::from),
            tags: row.tags,
            expires_at: row.expires_at,
            created_at: row.created_at,
            version: Version::new(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ScrollRow {
    id: String,
    jar_id: String,
    title: Option<String>,
    format: Option<String>,
    uploaded: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ScrollRow> for Scroll {
    type Error = StoreError;

    fn try_from(row: ScrollRow) -> Result<Self, Self::Error> {
        let id = ScrollId::parse(&row.id)
            .ok_or_else(|| StoreError::backend(format!("malformed scroll id {:?}", row.id)))?;
        let jar_id = JarId::parse(&row.jar_id)
            .ok_or_else(|| StoreError::backend(format!("malformed jar id {:?}", row.jar_id)))?;

        Ok(Scroll {
            id,
            jar_id,
            title: row.title,
            format: row.format,
            state: ScrollState::from_uploaded(row.uploaded),
            created_at: row.created_at,
            version: Version::new(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    activated: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::new(row.id),
            username: row.username,
            email: Email::from_trusted(row.email),
            password_hash: PasswordHash::from(row.password_hash),
            activated: row.activated,
            created_at: row.created_at,
            version: Version::new(row.updated_at),
        }
    }
}

pub(super) fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scroll_row(id: &str) -> ScrollRow {
        let now = Utc::now();
        ScrollRow {
            id: id.to_string(),
            jar_id: "JarJar01".to_string(),
            title: None,
            format: Some("rust".to_string()),
            uploaded: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_scroll_row_conversion() {
        let scroll = Scroll::try_from(scroll_row("Scroll01")).unwrap();
        assert_eq!(scroll.id.as_str(), "Scroll01");
        assert!(scroll.state.is_delivered());
    }

    #[test]
    fn test_malformed_id_is_backend_error() {
        let result = Scroll::try_from(scroll_row("bad id"));
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }
}
