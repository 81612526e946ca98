//! SQL statements shared by the repositories and the unit of work
//!
//! Each helper takes any Postgres executor, so the same statement runs
//! against the pool or inside an open transaction.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use super::map_sqlx_error;
use super::rows::{JarRow, ScrollRow, UserRow, collect};
use crate::domain::auth::{NewUser, Token, TokenHash, TokenScope, User, UserId};
use crate::domain::jar::{Jar, JarId, NewJar, NewScroll, Scroll, ScrollId, ScrollUpdate};
use crate::domain::store::{StoreError, Version};

const JAR_COLUMNS: &str =
    "id, user_id, name, access, password_hash, tags, expires_at, created_at, updated_at";
const SCROLL_COLUMNS: &str = "id, jar_id, title, format, uploaded, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, email, password_hash, activated, created_at, updated_at";

/// Next version of a row: `max(now, updated_at + 1µs)`
const NEXT_VERSION: &str = "GREATEST(clock_timestamp(), updated_at + interval '1 microsecond')";

pub(super) async fn find_jar<'e, E>(executor: E, id: &JarId) -> Result<Option<Jar>, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {JAR_COLUMNS} FROM scrolljar \
         WHERE id = $1 AND (expires_at IS NULL OR expires_at > NOW())"
    );

    sqlx::query_as::<_, JarRow>(&sql)
        .bind(id.as_str())
        .fetch_optional(executor)
        .await
        .map_err(map_sqlx_error)?
        .map(Jar::try_from)
        .transpose()
}

pub(super) async fn list_jars_by_owner<'e, E>(
    executor: E,
    owner: &UserId,
) -> Result<Vec<Jar>, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {JAR_COLUMNS} FROM scrolljar \
         WHERE user_id = $1 AND (expires_at IS NULL OR expires_at > NOW()) \
         ORDER BY created_at DESC"
    );

    let rows = sqlx::query_as::<_, JarRow>(&sql)
        .bind(owner.as_i64())
        .fetch_all(executor)
        .await
        .map_err(map_sqlx_error)?;

    collect(rows)
}

/// Insert under `id`. `None` when the id is already taken.
pub(super) async fn insert_jar<'e, E>(
    executor: E,
    id: &JarId,
    jar: &NewJar,
) -> Result<Option<Jar>, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO scrolljar (id, user_id, name, access, password_hash, tags, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (id) DO NOTHING \
         RETURNING {JAR_COLUMNS}"
    );

    sqlx::query_as::<_, JarRow>(&sql)
        .bind(id.as_str())
        .bind(jar.owner.map(|owner| owner.as_i64()))
        .bind(&jar.name)
        .bind(jar.access.as_i16())
        .bind(jar.password_hash.as_ref().map(|hash| hash.as_str()))
        .bind(&jar.tags)
        .bind(jar.expires_at)
        .fetch_optional(executor)
        .await
        .map_err(map_sqlx_error)?
        .map(Jar::try_from)
        .transpose()
}

pub(super) async fn delete_jar<'e, E>(executor: E, id: &JarId) -> Result<u64, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("DELETE FROM scrolljar WHERE id = $1")
        .bind(id.as_str())
        .execute(executor)
        .await
        .map(|result| result.rows_affected())
        .map_err(map_sqlx_error)
}

pub(super) async fn find_scroll<'e, E>(
    executor: E,
    id: &ScrollId,
) -> Result<Option<Scroll>, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM scroll s JOIN scrolljar j ON j.id = s.jar_id \
         WHERE s.id = $1 AND (j.expires_at IS NULL OR j.expires_at > NOW())",
        qualified(SCROLL_COLUMNS, "s")
    );

    sqlx::query_as::<_, ScrollRow>(&sql)
        .bind(id.as_str())
        .fetch_optional(executor)
        .await
        .map_err(map_sqlx_error)?
        .map(Scroll::try_from)
        .transpose()
}

pub(super) async fn list_scrolls_by_jar<'e, E>(
    executor: E,
    jar_id: &JarId,
) -> Result<Vec<Scroll>, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM scroll s JOIN scrolljar j ON j.id = s.jar_id \
         WHERE s.jar_id = $1 AND (j.expires_at IS NULL OR j.expires_at > NOW()) \
         ORDER BY s.created_at, s.id",
        qualified(SCROLL_COLUMNS, "s")
    );

    let rows = sqlx::query_as::<_, ScrollRow>(&sql)
        .bind(jar_id.as_str())
        .fetch_all(executor)
        .await
        .map_err(map_sqlx_error)?;

    collect(rows)
}

/// Insert under `id`. `None` when the id is already taken.
pub(super) async fn insert_scroll<'e, E>(
    executor: E,
    id: &ScrollId,
    scroll: &NewScroll,
) -> Result<Option<Scroll>, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO scroll (id, jar_id, title, format) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (id) DO NOTHING \
         RETURNING {SCROLL_COLUMNS}"
    );

    sqlx::query_as::<_, ScrollRow>(&sql)
        .bind(id.as_str())
        .bind(scroll.jar_id.as_str())
        .bind(scroll.title.as_deref())
        .bind(scroll.format.as_deref())
        .fetch_optional(executor)
        .await
        .map_err(map_sqlx_error)?
        .map(Scroll::try_from)
        .transpose()
}

pub(super) async fn update_scroll_metadata<'e, E>(
    executor: E,
    id: &ScrollId,
    update: &ScrollUpdate,
    expected: Version,
) -> Result<Version, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "UPDATE scroll SET title = COALESCE($2, title), format = COALESCE($3, format), \
         updated_at = {NEXT_VERSION} \
         WHERE id = $1 AND updated_at = $4 \
         RETURNING updated_at"
    );

    conditional_write(
        sqlx::query_scalar::<_, DateTime<Utc>>(&sql)
            .bind(id.as_str())
            .bind(update.title.as_deref())
            .bind(update.format.as_deref())
            .bind(expected.as_datetime())
            .fetch_optional(executor)
            .await,
    )
}

pub(super) async fn mark_scroll_delivered<'e, E>(
    executor: E,
    id: &ScrollId,
    expected: Version,
) -> Result<Version, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "UPDATE scroll SET uploaded = TRUE, updated_at = {NEXT_VERSION} \
         WHERE id = $1 AND updated_at = $2 AND uploaded = FALSE \
         RETURNING updated_at"
    );

    conditional_write(
        sqlx::query_scalar::<_, DateTime<Utc>>(&sql)
            .bind(id.as_str())
            .bind(expected.as_datetime())
            .fetch_optional(executor)
            .await,
    )
}

pub(super) async fn delete_scroll<'e, E>(executor: E, id: &ScrollId) -> Result<u64, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("DELETE FROM scroll WHERE id = $1")
        .bind(id.as_str())
        .execute(executor)
        .await
        .map(|result| result.rows_affected())
        .map_err(map_sqlx_error)
}

pub(super) async fn existing_scroll_ids<'e, E>(
    executor: E,
    ids: &[ScrollId],
) -> Result<Vec<ScrollId>, StoreError>
where
    E: PgExecutor<'e>,
{
    let raw: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();

    let found = sqlx::query_scalar::<_, String>("SELECT id FROM scroll WHERE id = ANY($1)")
        .bind(&raw)
        .fetch_all(executor)
        .await
        .map_err(map_sqlx_error)?;

    Ok(found.iter().filter_map(|id| ScrollId::parse(id)).collect())
}

pub(super) async fn find_user_by_id<'e, E>(
    executor: E,
    id: &UserId,
) -> Result<Option<User>, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id.as_i64())
        .fetch_optional(executor)
        .await
        .map(|row| row.map(User::from))
        .map_err(map_sqlx_error)
}

pub(super) async fn find_user_by_email<'e, E>(
    executor: E,
    email: &str,
) -> Result<Option<User>, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

    sqlx::query_as::<_, UserRow>(&sql)
        .bind(email)
        .fetch_optional(executor)
        .await
        .map(|row| row.map(User::from))
        .map_err(map_sqlx_error)
}

pub(super) async fn insert_user<'e, E>(executor: E, user: &NewUser) -> Result<User, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
         RETURNING {USER_COLUMNS}"
    );

    sqlx::query_as::<_, UserRow>(&sql)
        .bind(&user.username)
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .fetch_one(executor)
        .await
        .map(User::from)
        .map_err(map_sqlx_error)
}

pub(super) async fn set_user_activated<'e, E>(
    executor: E,
    id: &UserId,
    activated: bool,
    expected: Version,
) -> Result<Version, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "UPDATE users SET activated = $2, updated_at = {NEXT_VERSION} \
         WHERE id = $1 AND updated_at = $3 \
         RETURNING updated_at"
    );

    conditional_write(
        sqlx::query_scalar::<_, DateTime<Utc>>(&sql)
            .bind(id.as_i64())
            .bind(activated)
            .bind(expected.as_datetime())
            .fetch_optional(executor)
            .await,
    )
}

pub(super) async fn insert_token<'e, E>(executor: E, token: &Token) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("INSERT INTO tokens (hash, user_id, scope, expires_at) VALUES ($1, $2, $3, $4)")
        .bind(token.hash.as_str())
        .bind(token.user_id.as_i64())
        .bind(token.scope.as_str())
        .bind(token.expires_at)
        .execute(executor)
        .await
        .map(|_| ())
        .map_err(map_sqlx_error)
}

pub(super) async fn find_user_by_token<'e, E>(
    executor: E,
    hash: &TokenHash,
    scope: TokenScope,
    now: DateTime<Utc>,
) -> Result<Option<User>, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM users u JOIN tokens t ON t.user_id = u.id \
         WHERE t.hash = $1 AND t.scope = $2 AND t.expires_at > $3",
        qualified(USER_COLUMNS, "u")
    );

    sqlx::query_as::<_, UserRow>(&sql)
        .bind(hash.as_str())
        .bind(scope.as_str())
        .bind(now)
        .fetch_optional(executor)
        .await
        .map(|row| row.map(User::from))
        .map_err(map_sqlx_error)
}

pub(super) async fn delete_tokens_for_user<'e, E>(
    executor: E,
    user_id: &UserId,
    scope: TokenScope,
) -> Result<u64, StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("DELETE FROM tokens WHERE user_id = $1 AND scope = $2")
        .bind(user_id.as_i64())
        .bind(scope.as_str())
        .execute(executor)
        .await
        .map(|result| result.rows_affected())
        .map_err(map_sqlx_error)
}

/// Zero rows from a compare-and-write means the version moved on
fn conditional_write(
    result: Result<Option<DateTime<Utc>>, sqlx::Error>,
) -> Result<Version, StoreError> {
    match result.map_err(map_sqlx_error)? {
        Some(updated_at) => Ok(Version::new(updated_at)),
        None => Err(StoreError::EditConflict),
    }
}

fn qualified(columns: &str, alias: &str) -> String {
    columns
        .split(", ")
        .map(|column| format!("{alias}.{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}
