use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use crate::app::domain::{OrganizationId, PermissionSet, Role, Tier, UserId};

/// Database row for users table. `role` stays a raw string here: parsing
/// and the restrictive fallback for unrecognized values happen at the
/// identity layer, not in storage.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub organization_id: String,
    pub subject_id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub tier: Option<i64>,
    pub is_active: bool,
    pub phone: Option<String>,
    pub permissions: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data structure for inserting a new user. Tier and permissions are not
/// fields here: they are always derived from `role` at insert time so the
/// cached columns can never start out stale.
pub struct NewUser {
    pub id: UserId,
    pub organization_id: OrganizationId,
    pub subject_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
}

/// Find a user by the identity provider's stable subject id.
pub async fn find_by_subject<'e, E>(executor: E, subject_id: &str) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE subject_id = ?")
        .bind(subject_id)
        .fetch_optional(executor)
        .await
}

/// Find a user by ID.
pub async fn find_by_id<'e, E>(executor: E, user_id: &str) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// List all users of an organization, newest first.
pub async fn list_for_organization<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<Vec<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE organization_id = ? ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .fetch_all(executor)
    .await
}

/// Insert a new user. Tier and the permission cache are derived from the
/// role here so the denormalized columns match the catalog from day one.
pub async fn insert<'e, E>(executor: E, user: &NewUser) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let tier = user.role.tier().map(|t| t.as_u8() as i64);
    let permissions = super::encode_json(&crate::app::domain::derive_permissions(user.role))?;

    sqlx::query(
        "INSERT INTO users \
         (id, organization_id, subject_id, email, name, role, tier, is_active, phone, permissions, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)",
    )
    .bind(user.id.as_str())
    .bind(user.organization_id.as_str())
    .bind(&user.subject_id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(user.role.to_string())
    .bind(tier)
    .bind(&user.phone)
    .bind(permissions)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Update profile fields (name/phone). `None` leaves the field unchanged.
pub async fn update_profile<'e, E>(
    executor: E,
    user_id: &str,
    name: Option<&str>,
    phone: Option<&str>,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query(
        "UPDATE users SET name = COALESCE(?, name), phone = COALESCE(?, phone), updated_at = ? WHERE id = ?",
    )
    .bind(name)
    .bind(phone)
    .bind(now)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Change a user's role. The cached tier and permission set are recomputed
/// in the same statement; the cache is never writable on its own.
pub async fn set_role<'e, E>(executor: E, user_id: &str, role: Role) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let tier = role.tier().map(|t| t.as_u8() as i64);
    let permissions = super::encode_json(&crate::app::domain::derive_permissions(role))?;

    sqlx::query("UPDATE users SET role = ?, tier = ?, permissions = ?, updated_at = ? WHERE id = ?")
        .bind(role.to_string())
        .bind(tier)
        .bind(permissions)
        .bind(now)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Toggle the active flag (soft deactivation; users are never hard-deleted).
pub async fn set_active<'e, E>(executor: E, user_id: &str, active: bool) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();
    sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(now)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

impl User {
    /// Parse the cached tier column. Corrupt values degrade to no tier.
    pub fn parsed_tier(&self) -> Option<Tier> {
        self.tier.and_then(|t| u8::try_from(t).ok()).and_then(Tier::from_u8)
    }

    /// Parse the cached permission column. Corrupt data degrades to the
    /// all-false set rather than erroring; the checker must never grant
    /// access because of a bad cache.
    pub fn parsed_permissions(&self) -> PermissionSet {
        serde_json::from_str(&self.permissions).unwrap_or(PermissionSet::RESTRICTED)
    }

    /// Parse the stored role. Unrecognized values yield `None`.
    pub fn parsed_role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}
